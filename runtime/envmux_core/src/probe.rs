//! The resolution-chain probe.
//!
//! Loads issued by the machinery itself (parent packages, direct
//! [`Runtime::import_module`] calls, bare [`Runtime::find_spec`] lookups) never
//! pass through the interceptor. The probe sits first in the finder chain and
//! gives those lookups the same caller inference: if the caller belongs to an
//! environment, the rest of the chain runs with that environment active.

use crate::activation::ActivationKind;
use crate::error::ImportResult;
use crate::finder::{FindRequest, Finder, ModuleSpec};
use crate::runtime::Runtime;

#[derive(Debug, Default)]
pub struct ResolutionChainProbe;

impl Finder for ResolutionChainProbe {
    fn name(&self) -> &'static str {
        "probe"
    }

    fn find_spec(
        &self,
        runtime: &mut Runtime,
        request: &FindRequest<'_>,
    ) -> ImportResult<Option<ModuleSpec>> {
        // An explicit activation already chose the environment.
        if runtime.is_forced() {
            return Ok(None);
        }
        let Some(env) = runtime.resolve_caller() else {
            return Ok(None);
        };

        tracing::trace!(name = %request.name, %env, "probe deferring under caller environment");
        let mut scoped = runtime.activate_scoped(Some(env), ActivationKind::Probe);
        scoped.find_spec_from(request.position + 1, request.name, request.search_locations)
    }
}
