//! Stack safety for nested module loads.
//!
//! Loading a module executes its body, and every `use` in the body is a new
//! load request that may execute another body. Import chains therefore
//! recurse through the loader once per link, and long chains (or deep
//! package hierarchies) must not overflow the native stack.
//!
//! - **Native targets**: grows the stack on demand through `stacker`.
//! - **WASM targets**: plain passthrough.

/// Remaining stack below which a new segment is allocated (100KB).
const RED_ZONE: usize = 100 * 1024;

/// Size of each newly allocated stack segment (1MB).
const STACK_PER_LOAD: usize = 1024 * 1024;

/// Run `f`, first growing the stack if less than the red zone remains.
///
/// Wrap every recursive step of the loader in this:
///
/// ```text
/// fn find_and_load(&mut self, name: &ModuleName) -> ImportResult<ModuleRef> {
///     ensure_sufficient_stack(|| self.find_and_load_uncached(name))
/// }
/// ```
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_LOAD, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
