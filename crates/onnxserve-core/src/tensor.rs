use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    Float32,
    Float16,
    Int64,
    Int32,
    Uint8,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::Float32 => "float32",
            ElementType::Float16 => "float16",
            ElementType::Int64 => "int64",
            ElementType::Int32 => "int32",
            ElementType::Uint8 => "uint8",
        };
        f.write_str(name)
    }
}

/// One named float array, as carried on the wire in both directions.
#[derive(Clone, Debug, PartialEq)]
pub struct NamedArray {
    pub name: String,
    pub values: Vec<f32>,
}

impl NamedArray {
    pub fn new(name: impl Into<String>, values: impl Into<Vec<f32>>) -> Self {
        Self {
            name: name.into(),
            values: values.into(),
        }
    }
}

/// A native input tensor bound to one input slot for the duration of a request.
///
/// The handle is released when the `BoundTensor` (or whatever the backend
/// moved the handle into) is dropped.
#[derive(Debug)]
pub struct BoundTensor<T> {
    name: String,
    shape: [usize; 2],
    element_type: ElementType,
    handle: T,
}

impl<T> BoundTensor<T> {
    pub fn new(slot: &crate::SlotDescriptor, handle: T) -> Self {
        Self {
            name: slot.name.clone(),
            shape: slot.bound_shape(),
            element_type: slot.element_type,
            handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn handle(&self) -> &T {
        &self.handle
    }

    pub fn into_parts(self) -> (String, T) {
        (self.name, self.handle)
    }
}
