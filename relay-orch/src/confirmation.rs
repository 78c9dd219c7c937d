//! `auto_confirm` wiring (§6.3): when set, the confirmation handler never
//! prompts — every call is treated as already `ProceedAlways`.

use relay_tool::{ConfirmationHandler, HandlerFuture};
use relay_types::{CallId, ConfirmationDetails, ConfirmationOutcome};

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysApprove;

impl ConfirmationHandler for AlwaysApprove {
    fn confirm<'a>(&'a self, _call_id: &'a CallId, _details: &'a ConfirmationDetails) -> HandlerFuture<'a, ConfirmationOutcome> {
        Box::pin(async { ConfirmationOutcome::ProceedAlways })
    }
}
