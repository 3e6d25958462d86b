use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use tracing::debug;

use super::controller::{FormController, FormResult, Trigger};
use super::surface::FormSurface;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitDecision {
    Proceed,
    Suppress,
}

/// Outcome of a submission attempt.
///
/// The decision is taken once every field's synchronous validators ran.
/// Remote checks still in flight at that point are not waited for, so a form
/// whose only problem is a pending remote rejection may be let through. Await
/// [`SubmitGate::settle`] to get the final verdict.
pub struct SubmitGate {
    decision: SubmitDecision,
    settling: BoxFuture<'static, FormResult<bool>>,
}

impl SubmitGate {
    pub fn decision(&self) -> SubmitDecision {
        self.decision
    }

    pub fn is_suppressed(&self) -> bool {
        self.decision == SubmitDecision::Suppress
    }

    pub async fn settle(self) -> FormResult<bool> {
        self.settling.await
    }
}

impl<S> FormController<S>
where
    S: FormSurface,
{
    pub async fn validate(&self) -> FormResult<bool> {
        self.start_validation()?.await
    }

    pub fn submit(&self) -> FormResult<SubmitGate> {
        let settling = self.start_validation()?;
        let decision = if self.is_incomplete()? || self.has_errors()? {
            SubmitDecision::Suppress
        } else {
            SubmitDecision::Proceed
        };
        debug!(form_id = self.form_id()?.0, ?decision, "submission gated");
        Ok(SubmitGate { decision, settling })
    }

    fn start_validation(&self) -> FormResult<BoxFuture<'static, FormResult<bool>>> {
        let mut remote = Vec::new();
        for key in self.fields()? {
            let Some(pass) = self.begin_pass(&key, Trigger::Submit)? else {
                continue;
            };
            if pass.remote.is_some() {
                remote.push(pass);
            } else {
                let errors = pass.errors.clone();
                self.finish_pass(&pass, errors)?;
            }
        }

        let controller = self.clone();
        Ok(async move {
            let controller = &controller;
            let checks = remote.iter().map(|pass| async move {
                if let Some(errors) = controller.resolve_remote(pass).await? {
                    controller.finish_pass(pass, errors)?;
                }
                FormResult::Ok(())
            });
            for result in join_all(checks).await {
                result?;
            }
            controller.toggle_submit()?;
            controller.focus_error()?;
            controller.is_valid()
        }
        .boxed())
    }
}
