use tracing::debug;

use crate::{EngineError, ModelHandle, NamedArray};

/// Copies each engine output into a `NamedArray` named after its slot,
/// in output-slot order.
pub fn extract_outputs<M: ModelHandle + ?Sized>(
    model: &M,
    outputs: &[M::Output],
) -> Result<Vec<NamedArray>, EngineError> {
    let slots = model.output_slots();
    if outputs.len() != slots.len() {
        return Err(EngineError::OutputCount {
            expected: slots.len(),
            got: outputs.len(),
        });
    }

    slots
        .iter()
        .zip(outputs)
        .map(|(slot, output)| {
            let values = model.extract(slot, output)?;
            if values.len() != slot.expected_element_count {
                debug!(
                    slot = %slot.name,
                    declared = slot.expected_element_count,
                    produced = values.len(),
                    "output element count differs from declared shape"
                );
            }
            Ok(NamedArray {
                name: slot.name.clone(),
                values,
            })
        })
        .collect()
}
