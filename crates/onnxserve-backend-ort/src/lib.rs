use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use anyhow::{bail, Context, Result};
use onnxserve_core::{
    BoundTensor, ElementType, EngineError, ModelHandle, ModelLoadError, ModelSpec, SlotDescriptor,
};
use ort::{
    session::{
        builder::{GraphOptimizationLevel, SessionBuilder},
        Session, SessionInputValue,
    },
    tensor::TensorElementType,
    value::{DynValue, ValueType},
};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda { device_id: u32 },
}

impl FromStr for Device {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        if raw.eq_ignore_ascii_case("cpu") {
            return Ok(Device::Cpu);
        }

        if let Some(rest) = raw.strip_prefix("cuda:") {
            let device_id: u32 = rest.parse().context("invalid cuda device id")?;
            return Ok(Device::Cuda { device_id });
        }

        bail!("unsupported device: {raw} (expected cpu or cuda:N)");
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Optimization {
    Disable,
    Basic,
    Extended,
    All,
}

impl Optimization {
    fn level(self) -> GraphOptimizationLevel {
        match self {
            Optimization::Disable => GraphOptimizationLevel::Disable,
            Optimization::Basic => GraphOptimizationLevel::Level1,
            Optimization::Extended => GraphOptimizationLevel::Level2,
            Optimization::All => GraphOptimizationLevel::Level3,
        }
    }
}

impl FromStr for Optimization {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "disable" | "none" => Ok(Optimization::Disable),
            "basic" => Ok(Optimization::Basic),
            "extended" => Ok(Optimization::Extended),
            "all" => Ok(Optimization::All),
            _ => bail!("unsupported optimization level: {raw} (expected disable, basic, extended or all)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct OrtOptions {
    pub device: Device,
    pub optimization: Optimization,
    /// 0 leaves the choice to onnxruntime.
    pub intra_op_threads: usize,
}

impl Default for OrtOptions {
    fn default() -> Self {
        Self {
            device: Device::Cpu,
            optimization: Optimization::Basic,
            intra_op_threads: 0,
        }
    }
}

/// An ONNX model loaded into an onnxruntime session.
///
/// `Session::run` needs exclusive access, so the session is kept behind a
/// mutex; binding and extraction do not touch it.
pub struct OrtModel {
    spec: ModelSpec,
    session: Mutex<Session>,
}

impl OrtModel {
    pub fn load(path: impl AsRef<Path>, options: &OrtOptions) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        check_readable(path)?;

        let session = build_session(path, options).map_err(|err| ModelLoadError::Rejected {
            path: path.to_path_buf(),
            source: err.into(),
        })?;
        let spec = build_model_spec(&session)?;

        info!(
            path = %path.display(),
            inputs = spec.inputs.len(),
            outputs = spec.outputs.len(),
            "model loaded"
        );

        Ok(Self {
            spec,
            session: Mutex::new(session),
        })
    }
}

impl ModelHandle for OrtModel {
    type Input = DynValue;
    type Output = DynValue;

    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn bind(&self, slot: &SlotDescriptor, values: &[f32]) -> Result<DynValue, EngineError> {
        let shape = slot.bound_shape().to_vec();
        let tensor = ort::value::Tensor::from_array((shape, values.to_vec()))
            .map_err(|e| EngineError::bind(&slot.name, e))?;
        Ok(tensor.into_dyn())
    }

    fn execute(&self, inputs: Vec<BoundTensor<DynValue>>) -> Result<Vec<DynValue>, EngineError> {
        let ort_inputs = inputs
            .into_iter()
            .map(|bound| {
                let (name, value) = bound.into_parts();
                (name, SessionInputValue::from(value))
            })
            .collect::<Vec<_>>();

        // A panic elsewhere while the lock was held leaves the session itself intact.
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let mut outputs = session.run(ort_inputs).map_err(EngineError::execute)?;

        pick_by_name(&self.spec.outputs, |name| outputs.remove(name))
    }

    fn extract(&self, slot: &SlotDescriptor, output: &DynValue) -> Result<Vec<f32>, EngineError> {
        let array = output
            .try_extract_array::<f32>()
            .map_err(|e| EngineError::extract(&slot.name, e))?;
        Ok(array.iter().copied().collect())
    }
}

/// Takes one engine output per slot, by slot name, in slot order.
fn pick_by_name<V>(
    slots: &[SlotDescriptor],
    mut take: impl FnMut(&str) -> Option<V>,
) -> Result<Vec<V>, EngineError> {
    let mut picked = Vec::with_capacity(slots.len());
    for slot in slots {
        let value = take(slot.name.as_str()).ok_or_else(|| EngineError::MissingOutput {
            slot: slot.name.clone(),
        })?;
        picked.push(value);
    }
    Ok(picked)
}

fn check_readable(path: &Path) -> Result<(), ModelLoadError> {
    if !path.exists() {
        return Err(ModelLoadError::NotFound {
            path: path.to_path_buf(),
        });
    }
    std::fs::File::open(path).map_err(|source| ModelLoadError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn build_session(path: &Path, options: &OrtOptions) -> Result<Session> {
    let mut builder = Session::builder()
        .context("failed to create ORT session builder")?
        .with_optimization_level(options.optimization.level())
        .context("failed to configure ORT session builder")?;

    if options.intra_op_threads > 0 {
        builder = builder
            .with_intra_threads(options.intra_op_threads)
            .context("failed to set ORT intra-op threads")?;
    }

    let builder = configure_session_builder(builder, &options.device)?;

    builder
        .commit_from_file(path)
        .context("failed to load ONNX model")
}

fn configure_session_builder(builder: SessionBuilder, device: &Device) -> Result<SessionBuilder> {
    match device {
        Device::Cpu => Ok(builder),
        Device::Cuda { device_id } => configure_cuda(builder, *device_id),
    }
}

fn configure_cuda(builder: SessionBuilder, device_id: u32) -> Result<SessionBuilder> {
    #[cfg(feature = "cuda")]
    {
        use ort::execution_providers::cuda::CUDAExecutionProvider;
        let ep = CUDAExecutionProvider::default()
            .with_device_id(device_id as i32)
            .build();
        builder
            .with_execution_providers([ep])
            .context("failed to enable ORT CUDA execution provider")
    }
    #[cfg(not(feature = "cuda"))]
    {
        let _ = (builder, device_id);
        bail!("CUDA requested but onnxserve-backend-ort was built without the `cuda` feature")
    }
}

fn build_model_spec(session: &Session) -> Result<ModelSpec, ModelLoadError> {
    let inputs = session
        .inputs
        .iter()
        .map(|input| slot_from_value_type(&input.name, &input.input_type))
        .collect::<Result<Vec<_>, _>>()?;

    let outputs = session
        .outputs
        .iter()
        .map(|output| slot_from_value_type(&output.name, &output.output_type))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ModelSpec { inputs, outputs })
}

fn slot_from_value_type(name: &str, value_type: &ValueType) -> Result<SlotDescriptor, ModelLoadError> {
    let unsupported = |reason: String| ModelLoadError::UnsupportedSlot {
        name: name.to_string(),
        reason,
    };

    let ValueType::Tensor { ty, shape, .. } = value_type else {
        return Err(unsupported("not a tensor".to_string()));
    };

    let element_type = ort_tensor_element_to_element_type(*ty)
        .ok_or_else(|| unsupported(format!("unsupported element type {ty}")))?;
    if element_type != ElementType::Float32 {
        return Err(unsupported(format!("expected float32, model declares {element_type}")));
    }

    Ok(SlotDescriptor::new(name, element_count(shape), element_type))
}

/// Dynamic dimensions count as 1: the batch dimension is fixed to 1.
fn element_count(dims: &[i64]) -> usize {
    dims.iter()
        .map(|d| usize::try_from(*d).unwrap_or(1))
        .product()
}

fn ort_tensor_element_to_element_type(ty: TensorElementType) -> Option<ElementType> {
    match ty {
        TensorElementType::Float32 => Some(ElementType::Float32),
        TensorElementType::Float16 => Some(ElementType::Float16),
        TensorElementType::Int64 => Some(ElementType::Int64),
        TensorElementType::Int32 => Some(ElementType::Int32),
        TensorElementType::Uint8 => Some(ElementType::Uint8),
        _ => None,
    }
}
