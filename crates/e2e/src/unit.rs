//! Test units built from YAML specs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use parasuite_common::{ambient, ContextId, SessionRef, TestUnit, TestUnitRef, UnitContext, UnitError};

use crate::error::{E2eError, E2eResult};
use crate::playwright::{screenshot_js, step_name, step_to_js, wait_for_js};
use crate::spec::{TestSpec, TestStep};

/// Runs one [`TestSpec`] against the session of the context executing it.
pub struct SpecUnit {
    spec: TestSpec,
    screenshot_dir: PathBuf,
}

impl SpecUnit {
    pub fn new(spec: TestSpec, screenshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            spec,
            screenshot_dir: screenshot_dir.into(),
        }
    }

    /// One unit per spec, all writing screenshots under `screenshot_dir`.
    pub fn from_specs(specs: Vec<TestSpec>, screenshot_dir: impl Into<PathBuf>) -> Vec<TestUnitRef> {
        let dir = screenshot_dir.into();
        specs
            .into_iter()
            .map(|spec| Arc::new(Self::new(spec, dir.clone())) as TestUnitRef)
            .collect()
    }

    pub fn spec(&self) -> &TestSpec {
        &self.spec
    }

    /// `{spec}_{step}_{contextId}.png`
    pub fn screenshot_path(&self, step: &str, context: ContextId) -> PathBuf {
        self.screenshot_dir
            .join(format!("{}_{}_{}.png", self.spec.name, step, context))
    }

    async fn execute(&self) -> Result<(), UnitError> {
        let context = ambient::current_id()?;
        let session = ambient::current_session()?;

        for (index, step) in self.spec.steps.iter().enumerate() {
            let name = step_name(step);
            debug!(step = %name, "Executing step");

            self.run_step(&session, context, index, step)
                .await
                .map_err(|e| {
                    UnitError::failed(
                        E2eError::StepFailed {
                            step: name,
                            reason: e.to_string(),
                        }
                        .to_string(),
                    )
                })?;
        }
        Ok(())
    }

    async fn run_step(
        &self,
        session: &SessionRef,
        context: ContextId,
        index: usize,
        step: &TestStep,
    ) -> E2eResult<()> {
        match step {
            TestStep::Navigate {
                url,
                wait_for_selector,
            } => {
                session.navigate(url).await?;
                if let Some(selector) = wait_for_selector {
                    session.evaluate(&wait_for_js(selector)).await?;
                }
            }
            TestStep::Sleep { ms } => tokio::time::sleep(Duration::from_millis(*ms)).await,
            TestStep::Log { message } => info!("[TEST LOG] {}", message),
            TestStep::Screenshot {
                name,
                selector,
                full_page,
            } => {
                tokio::fs::create_dir_all(&self.screenshot_dir).await?;
                let path = self.screenshot_path(name, context);
                session
                    .evaluate(&screenshot_js(&path, selector.as_deref(), *full_page))
                    .await?;
            }
            other => {
                if let Some(js) = step_to_js(other, index) {
                    session.evaluate(&js).await?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TestUnit for SpecUnit {
    fn name(&self) -> &str {
        &self.spec.name
    }

    async fn run(&self, ctx: UnitContext) -> Result<(), UnitError> {
        if self.spec.skip {
            let reason = self
                .spec
                .skip_reason
                .clone()
                .unwrap_or_else(|| "marked skip".to_string());
            return Err(UnitError::skipped(reason));
        }
        ambient::scope(ctx, self.execute()).await
    }
}
