use onnxserve_core::{NamedArray, RunError};
use onnxserve_proto::inference as pb;
use onnxserve_proto::inference::runtime_server::RuntimeServer;
use onnxserve_runtime::{InferenceResponse, PoolHandle, SubmitError};
use tonic::metadata::{MetadataMap, MetadataValue};
use tonic::{Request, Response, Status};
use tonic_health::server::{HealthReporter, HealthService};

pub struct RuntimeSvc {
    pool: PoolHandle,
}

impl RuntimeSvc {
    pub fn new(pool: PoolHandle) -> Self {
        Self { pool }
    }
}

#[tonic::async_trait]
impl pb::runtime_server::Runtime for RuntimeSvc {
    async fn run(
        &self,
        req: Request<pb::SessionRequest>,
    ) -> std::result::Result<Response<pb::SessionResponse>, Status> {
        let inputs = req
            .into_inner()
            .array_map
            .into_iter()
            .map(|t| NamedArray {
                name: t.name,
                values: t.values,
            })
            .collect();

        let response = self.pool.submit(inputs).await.map_err(to_status)?;

        let mut reply = Response::new(pb::SessionResponse {
            array_map: Vec::with_capacity(response.outputs.len()),
        });
        insert_timings(reply.metadata_mut(), &response);
        reply.get_mut().array_map = response
            .outputs
            .into_iter()
            .map(|a| pb::Tuple {
                name: a.name,
                values: a.values,
            })
            .collect();

        Ok(reply)
    }
}

fn insert_timings(metadata: &mut MetadataMap, response: &InferenceResponse) {
    let timings = &response.timings;
    metadata.insert("x-queued-us", MetadataValue::from(response.queued_us));
    metadata.insert("x-bind-us", MetadataValue::from(timings.bind_us));
    metadata.insert("x-engine-us", MetadataValue::from(timings.engine_us));
    metadata.insert("x-extract-us", MetadataValue::from(timings.extract_us));
}

/// Standard `grpc.health.v1` service with the runtime marked as serving.
pub async fn health_service() -> (HealthReporter, HealthService) {
    let reporter = HealthReporter::new();
    reporter.set_serving::<RuntimeServer<RuntimeSvc>>().await;
    let service = HealthService::from_health_reporter(reporter.clone());
    (reporter, service)
}

fn to_status(err: SubmitError) -> Status {
    match err {
        SubmitError::Run(RunError::Validation(err)) => Status::invalid_argument(err.to_string()),
        SubmitError::Run(RunError::Engine(err)) => {
            Status::internal(format!("{:#}", anyhow::Error::new(err)))
        }
        SubmitError::PoolClosed => Status::unavailable("worker pool is shut down"),
        SubmitError::WorkerLost => Status::internal("worker dropped"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use onnxserve_core::{
        BoundTensor, Dispatcher, ElementType, EngineError, ModelHandle, ModelSpec, SlotDescriptor,
    };
    use onnxserve_runtime::{PoolConfig, WorkerPool};
    use onnxserve_proto::inference::runtime_server::Runtime;
    use tonic::Code;

    use super::*;

    /// Input `x` (4 elements) -> output `y` (2 elements): pairwise sums.
    /// An input starting with a negative value makes the engine fail.
    struct PairSum {
        spec: ModelSpec,
    }

    impl PairSum {
        fn new() -> Self {
            Self {
                spec: ModelSpec {
                    inputs: vec![SlotDescriptor::new("x", 4, ElementType::Float32)],
                    outputs: vec![SlotDescriptor::new("y", 2, ElementType::Float32)],
                },
            }
        }
    }

    impl ModelHandle for PairSum {
        type Input = Vec<f32>;
        type Output = Vec<f32>;

        fn spec(&self) -> &ModelSpec {
            &self.spec
        }

        fn bind(&self, _slot: &SlotDescriptor, values: &[f32]) -> Result<Vec<f32>, EngineError> {
            Ok(values.to_vec())
        }

        fn execute(&self, inputs: Vec<BoundTensor<Vec<f32>>>) -> Result<Vec<Vec<f32>>, EngineError> {
            let x = inputs[0].handle();
            if x[0] < 0.0 {
                return Err(EngineError::execute("negative input"));
            }
            Ok(vec![x.chunks(2).map(|c| c.iter().sum()).collect()])
        }

        fn extract(&self, _slot: &SlotDescriptor, output: &Vec<f32>) -> Result<Vec<f32>, EngineError> {
            Ok(output.clone())
        }
    }

    fn service() -> RuntimeSvc {
        let dispatcher = Dispatcher::new(Arc::new(PairSum::new()));
        let pool = WorkerPool::spawn(
            Arc::new(dispatcher),
            PoolConfig {
                workers: 2,
                queue_depth: 8,
            },
        )
        .expect("spawn pool");
        RuntimeSvc::new(pool.handle())
    }

    fn request(name: &str, values: Vec<f32>) -> Request<pb::SessionRequest> {
        Request::new(pb::SessionRequest {
            array_map: vec![pb::Tuple {
                name: name.to_string(),
                values,
            }],
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_returns_named_outputs() {
        let svc = service();
        let response = svc
            .run(request("x", vec![1.0, 2.0, 3.0, 4.0]))
            .await
            .expect("run")
            .into_inner();

        assert_eq!(
            response.array_map,
            vec![pb::Tuple {
                name: "y".to_string(),
                values: vec![3.0, 7.0],
            }]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_reports_timings_in_metadata() {
        let svc = service();
        let response = svc
            .run(request("x", vec![1.0, 2.0, 3.0, 4.0]))
            .await
            .expect("run");

        for key in ["x-queued-us", "x-bind-us", "x-engine-us", "x-extract-us"] {
            let value = response.metadata().get(key).expect(key);
            assert!(value.to_str().unwrap().parse::<u64>().is_ok());
        }
    }

    #[tokio::test]
    async fn health_reports_runtime_serving() {
        use tonic_health::pb::health_check_response::ServingStatus;
        use tonic_health::pb::health_server::Health;
        use tonic_health::pb::HealthCheckRequest;

        let (_reporter, health) = health_service().await;

        for service in ["", "inference.Runtime"] {
            let status = health
                .check(Request::new(HealthCheckRequest {
                    service: service.to_string(),
                }))
                .await
                .expect("health check")
                .into_inner()
                .status;
            assert_eq!(status, ServingStatus::Serving as i32);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn size_mismatch_is_invalid_argument() {
        let svc = service();
        let status = svc.run(request("x", vec![1.0, 2.0, 3.0])).await.unwrap_err();

        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "Invalid input size. Expected: '4' Got: '3'");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_input_is_invalid_argument() {
        let svc = service();
        let status = svc
            .run(request("z", vec![1.0, 2.0, 3.0, 4.0]))
            .await
            .unwrap_err();

        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "Input name 'x' not found in request");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn engine_failure_is_internal() {
        let svc = service();
        let status = svc
            .run(request("x", vec![-1.0, 2.0, 3.0, 4.0]))
            .await
            .unwrap_err();

        assert_eq!(status.code(), Code::Internal);
        assert!(status.message().contains("negative input"));
    }
}
