//! Call-stack tracking and caller inference.
//!
//! The runtime records which code is executing: every module body, every
//! host entry point that names its caller, and the runtime's own
//! interception frames. Caller inference walks this record innermost-first
//! to find the environment that owns the code issuing a load request.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::registry::{EnvId, EnvironmentRegistry};

/// Where a frame's code lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameLocation {
    File(PathBuf),
    /// Generated or in-memory code, labelled for diagnostics only.
    Synthetic(Arc<str>),
}

/// One entry of the call stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    location: FrameLocation,
    core: bool,
}

impl Frame {
    /// Code located in a file (module body or host caller).
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Frame {
            location: FrameLocation::File(path.into()),
            core: false,
        }
    }

    /// Code with no concrete location.
    pub fn synthetic(label: &str) -> Self {
        Frame {
            location: FrameLocation::Synthetic(Arc::from(label)),
            core: false,
        }
    }

    /// A frame belonging to the runtime itself.
    pub(crate) fn core(label: &str) -> Self {
        Frame {
            location: FrameLocation::Synthetic(Arc::from(label)),
            core: true,
        }
    }

    pub fn location(&self) -> &FrameLocation {
        &self.location
    }

    pub fn is_core(&self) -> bool {
        self.core
    }

    /// Absolute file location of non-core frames; `None` otherwise.
    pub fn concrete_path(&self) -> Option<&Path> {
        if self.core {
            return None;
        }
        match &self.location {
            FrameLocation::File(path) if path.is_absolute() => Some(path),
            FrameLocation::File(_) | FrameLocation::Synthetic(_) => None,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            FrameLocation::File(path) => write!(f, "{}", path.display()),
            FrameLocation::Synthetic(label) if self.core => write!(f, "<envmux:{label}>"),
            FrameLocation::Synthetic(label) => write!(f, "<{label}>"),
        }
    }
}

/// Frames of the code currently executing, outermost first.
#[derive(Clone, Debug, Default)]
pub struct CallStack {
    frames: Vec<Frame>,
}

impl CallStack {
    pub fn new() -> Self {
        CallStack::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn innermost(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Frames from the innermost outwards.
    pub fn innermost_first(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().rev()
    }
}

/// Infer the environment owning the code that issued the current request.
///
/// Core frames and frames without an absolute file location are skipped.
/// The remaining frames are classified innermost-first and the first one
/// that belongs to an environment decides; `None` when none does. Never
/// cached, since the caller differs on every request.
pub fn resolve_caller(stack: &CallStack, registry: &mut EnvironmentRegistry) -> Option<EnvId> {
    stack
        .innermost_first()
        .filter_map(Frame::concrete_path)
        .find_map(|path| registry.classify(path))
}
