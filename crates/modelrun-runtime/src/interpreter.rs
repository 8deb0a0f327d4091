use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use modelrun_core::{
    InterpreterError, ModelInputOutputOptions, ModelInputs, ModelOutputs, Result,
};
use tracing::debug;

use crate::request::micros_since;
use crate::{
    input_binder, output_binder, resolver, Api, AppContext, LocalModel, ModelHandle, ModelSource,
    RemoteModel, StatsEvent, Timings,
};

/// Runs inference for one model.
///
/// Cheap to clone and safe to share: clones reuse the same loaded model.
/// Callback entry points return immediately and deliver their result on the
/// app's main context.
#[derive(Clone)]
pub struct ModelInterpreter {
    app: AppContext,
    handle: Arc<ModelHandle>,
}

impl ModelInterpreter {
    pub fn for_local_model(app: &AppContext, model: LocalModel) -> Self {
        Self::new(app, ModelSource::Local(model))
    }

    pub fn for_remote_model(app: &AppContext, model: RemoteModel) -> Self {
        Self::new(app, ModelSource::Remote(model))
    }

    fn new(app: &AppContext, source: ModelSource) -> Self {
        let handle = ModelHandle::new(
            source,
            app.loader().clone(),
            app.model_manager().clone(),
            app.device().clone(),
        );
        Self {
            app: app.clone(),
            handle: Arc::new(handle),
        }
    }

    pub fn is_stats_collection_enabled(&self) -> bool {
        self.app.stats().is_enabled()
    }

    /// Persisted per app; affects telemetry only, never results.
    ///
    /// Blocks on the settings write, see [`StatsRecorder::set_enabled`].
    ///
    /// [`StatsRecorder::set_enabled`]: crate::StatsRecorder::set_enabled
    pub fn set_stats_collection_enabled(&self, enabled: bool) {
        self.app.stats().set_enabled(enabled);
    }

    pub fn run<F>(&self, inputs: ModelInputs, options: ModelInputOutputOptions, completion: F)
    where
        F: FnOnce(Result<ModelOutputs>) + Send + 'static,
    {
        let this = self.clone();
        self.dispatch(async move { this.run_async(inputs, options).await }, completion);
    }

    pub fn input_index_for_op<F>(&self, name: impl Into<String>, completion: F)
    where
        F: FnOnce(Result<usize>) + Send + 'static,
    {
        let this = self.clone();
        let name = name.into();
        self.dispatch(
            async move { this.input_index_for_op_async(&name).await },
            completion,
        );
    }

    pub fn output_index_for_op<F>(&self, name: impl Into<String>, completion: F)
    where
        F: FnOnce(Result<usize>) + Send + 'static,
    {
        let this = self.clone();
        let name = name.into();
        self.dispatch(
            async move { this.output_index_for_op_async(&name).await },
            completion,
        );
    }

    pub async fn run_async(
        &self,
        inputs: ModelInputs,
        options: ModelInputOutputOptions,
    ) -> Result<ModelOutputs> {
        let started = Instant::now();
        let mut timings = Timings::default();
        let result = self.execute(&inputs, &options, &mut timings).await;
        self.finish(Api::Run, started, timings, &result);
        result
    }

    pub async fn input_index_for_op_async(&self, name: &str) -> Result<usize> {
        let started = Instant::now();
        let result = self.resolve_input(name).await;
        self.finish(Api::InputIndexForOp, started, Timings::default(), &result);
        result
    }

    pub async fn output_index_for_op_async(&self, name: &str) -> Result<usize> {
        let started = Instant::now();
        let result = self.resolve_output(name).await;
        self.finish(Api::OutputIndexForOp, started, Timings::default(), &result);
        result
    }

    async fn resolve_input(&self, name: &str) -> Result<usize> {
        let model = self.handle.get().await?;
        resolver::input_index_for_op(&model, name)
    }

    async fn resolve_output(&self, name: &str) -> Result<usize> {
        let model = self.handle.get().await?;
        resolver::output_index_for_op(&model, name)
    }

    async fn execute(
        &self,
        inputs: &ModelInputs,
        options: &ModelInputOutputOptions,
        timings: &mut Timings,
    ) -> Result<ModelOutputs> {
        let t0 = Instant::now();
        let bound = input_binder::pack(inputs, options)?;
        let model = self.handle.get().await?;
        input_binder::check_graph(options, model.spec())?;
        output_binder::check_indices(options, model.spec())?;
        timings.validate_us = micros_since(t0);

        let t1 = Instant::now();
        let raw = tokio::task::spawn_blocking(move || model.infer(bound))
            .await
            .map_err(|e| InterpreterError::internal(format!("inference task failed: {e}")))??;
        timings.backend_us = micros_since(t1);
        if raw.is_empty() {
            return Err(InterpreterError::unknown(
                "no output was generated by the model",
            ));
        }

        let t2 = Instant::now();
        let outputs = output_binder::bind(&raw, options)?;
        timings.bind_us = micros_since(t2);
        Ok(outputs)
    }

    fn dispatch<T, Fut, F>(&self, work: Fut, completion: F)
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        F: FnOnce(Result<T>) + Send + 'static,
    {
        let main = self.app.main_context().clone();
        self.app.runtime().spawn(async move {
            let result = work.await;
            main.deliver(move || completion(result));
        });
    }

    fn finish<T>(&self, api: Api, started: Instant, timings: Timings, result: &Result<T>) {
        let model = self.handle.source().display_name();
        if let Err(err) = result {
            debug!(%api, model = %model, code = err.code(), error = %err, "call failed");
        }
        self.app.stats().record(StatsEvent {
            api,
            model,
            duration: started.elapsed(),
            timings,
            error: result.as_ref().err().map(InterpreterError::kind),
        });
    }
}
