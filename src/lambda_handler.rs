use crate::lambda_event::{InboundEvent, ReplyEvent};
use crate::relay_service::RelayService;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use log::debug;
use std::sync::Arc;

/// Serves invocations from the Lambda runtime API until the platform stops the process.
pub fn run(relay: Arc<RelayService>) -> Result<(), Error> {
  let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

  runtime.block_on(async move {
    let relay = relay.as_ref();

    lambda_runtime::run(service_fn(|event: LambdaEvent<InboundEvent>| async move {
      let (payload, context) = event.into_parts();
      debug!("Invocation {}", context.request_id);

      Ok::<ReplyEvent, Error>(relay.handle(payload).await)
    }))
    .await
  })
}
