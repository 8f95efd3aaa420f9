use crate::ElementType;

/// A named, fixed-size input or output position declared by the loaded model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotDescriptor {
    pub name: String,
    pub expected_element_count: usize,
    pub element_type: ElementType,
}

impl SlotDescriptor {
    pub fn new(name: impl Into<String>, expected_element_count: usize, element_type: ElementType) -> Self {
        Self {
            name: name.into(),
            expected_element_count,
            element_type,
        }
    }

    /// Batch dimension is always 1.
    pub fn bound_shape(&self) -> [usize; 2] {
        [1, self.expected_element_count]
    }
}

#[derive(Clone, Debug, Default)]
pub struct ModelSpec {
    pub inputs: Vec<SlotDescriptor>,
    pub outputs: Vec<SlotDescriptor>,
}
