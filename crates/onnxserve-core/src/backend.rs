use crate::{BoundTensor, EngineError, ModelSpec, SlotDescriptor};

/// A loaded model shared read-only by every worker.
///
/// Native resources are modelled as owned values: `Input` and `Output` release
/// their engine handle on drop, so a request cannot leak them on any path.
pub trait ModelHandle: Send + Sync + 'static {
    type Input;
    type Output;

    fn spec(&self) -> &ModelSpec;

    fn input_slots(&self) -> &[SlotDescriptor] {
        &self.spec().inputs
    }

    fn output_slots(&self) -> &[SlotDescriptor] {
        &self.spec().outputs
    }

    /// Creates the native tensor for `slot` over `values`.
    /// `values.len()` has already been checked against the slot.
    fn bind(&self, slot: &SlotDescriptor, values: &[f32]) -> Result<Self::Input, EngineError>;

    /// Runs one forward pass. Inputs arrive in input-slot order and outputs
    /// must be returned in output-slot order.
    fn execute(&self, inputs: Vec<BoundTensor<Self::Input>>) -> Result<Vec<Self::Output>, EngineError>;

    fn extract(&self, slot: &SlotDescriptor, output: &Self::Output) -> Result<Vec<f32>, EngineError>;
}
