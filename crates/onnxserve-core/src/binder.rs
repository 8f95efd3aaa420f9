use std::collections::HashMap;

use crate::{BoundTensor, ModelHandle, NamedArray, RunError, SlotDescriptor, ValidationError};

/// Matches every input slot to a request array by name and checks its size.
///
/// Nothing is allocated on the engine side here. The first failing slot in
/// slot order is reported. When a name appears more than once in the request,
/// the first occurrence wins.
pub fn match_inputs<'r>(
    slots: &[SlotDescriptor],
    request: &'r [NamedArray],
) -> Result<Vec<&'r NamedArray>, ValidationError> {
    let mut by_name: HashMap<&str, &NamedArray> = HashMap::with_capacity(request.len());
    for array in request {
        by_name.entry(array.name.as_str()).or_insert(array);
    }

    slots
        .iter()
        .map(|slot| {
            let array = by_name
                .get(slot.name.as_str())
                .copied()
                .ok_or_else(|| ValidationError::InputNotFound {
                    name: slot.name.clone(),
                })?;
            if array.values.len() != slot.expected_element_count {
                return Err(ValidationError::InputSizeMismatch {
                    name: slot.name.clone(),
                    expected: slot.expected_element_count,
                    got: array.values.len(),
                });
            }
            Ok(array)
        })
        .collect()
}

/// Produces one bound tensor per input slot, in slot order.
///
/// If the engine fails to bind slot k, the tensors bound for the earlier
/// slots are dropped (and thereby released) before the error is returned.
pub fn bind_inputs<M: ModelHandle + ?Sized>(
    model: &M,
    request: &[NamedArray],
) -> Result<Vec<BoundTensor<M::Input>>, RunError> {
    let slots = model.input_slots();
    let matched = match_inputs(slots, request)?;

    let mut bound = Vec::with_capacity(slots.len());
    for (slot, array) in slots.iter().zip(matched) {
        let handle = model.bind(slot, &array.values)?;
        bound.push(BoundTensor::new(slot, handle));
    }
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ElementType;

    fn slots() -> Vec<SlotDescriptor> {
        vec![
            SlotDescriptor::new("a", 2, ElementType::Float32),
            SlotDescriptor::new("b", 3, ElementType::Float32),
        ]
    }

    #[test]
    fn matches_by_name_not_position() {
        let request = vec![
            NamedArray::new("b", vec![4.0, 5.0, 6.0]),
            NamedArray::new("a", vec![1.0, 2.0]),
        ];
        let matched = match_inputs(&slots(), &request).unwrap();
        assert_eq!(matched[0].name, "a");
        assert_eq!(matched[1].name, "b");
    }

    #[test]
    fn first_duplicate_wins() {
        let request = vec![
            NamedArray::new("a", vec![1.0, 2.0]),
            NamedArray::new("b", vec![0.0; 3]),
            NamedArray::new("a", vec![9.0, 9.0]),
        ];
        let matched = match_inputs(&slots(), &request).unwrap();
        assert_eq!(matched[0].values, vec![1.0, 2.0]);
    }

    #[test]
    fn reports_first_failing_slot() {
        let request = vec![NamedArray::new("a", vec![1.0])];
        let err = match_inputs(&slots(), &request).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InputSizeMismatch {
                name: "a".to_string(),
                expected: 2,
                got: 1,
            }
        );
    }

    #[test]
    fn missing_input_message() {
        let request = vec![NamedArray::new("a", vec![1.0, 2.0])];
        let err = match_inputs(&slots(), &request).unwrap_err();
        assert_eq!(err.to_string(), "Input name 'b' not found in request");
    }

    #[test]
    fn extra_arrays_are_ignored() {
        let request = vec![
            NamedArray::new("a", vec![1.0, 2.0]),
            NamedArray::new("unused", vec![7.0]),
            NamedArray::new("b", vec![4.0, 5.0, 6.0]),
        ];
        assert_eq!(match_inputs(&slots(), &request).unwrap().len(), 2);
    }
}
