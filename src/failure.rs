//! Failure graph model
//!
//! A failure has an optional primary cause (a chain) and zero or more
//! suppressed sub-failures (a tree). The [`Failure`] trait is what the walker
//! and frame collector consume; [`Throwable`] is the owned implementation
//! produced by the crash report parser.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of a failure's recorded call trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFrame {
    /// Fully-qualified code unit name (e.g. `com.x.Foo$Inner`)
    pub unit: String,
    /// Method name, if recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Source file name, if recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Source line, if recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl CallFrame {
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            method: None,
            file: None,
            line: None,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_source(mut self, file: impl Into<String>, line: Option<u32>) -> Self {
        self.file = Some(file.into());
        self.line = line;
        self
    }
}

impl fmt::Display for CallFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.unit)?;
        if let Some(method) = &self.method {
            write!(f, ".{}", method)?;
        }
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "({}:{})", file, line),
            (Some(file), None) => write!(f, "({})", file),
            _ => Ok(()),
        }
    }
}

/// A node in a failure graph
///
/// Implementations are not required to be acyclic: callers that traverse the
/// graph guard against revisiting a node by its address (see [`node_identity`]).
pub trait Failure {
    /// Primary cause, if any
    fn cause(&self) -> Option<&dyn Failure>;

    /// Aggregated (suppressed) sub-failures, in recorded order
    fn suppressed(&self) -> Vec<&dyn Failure>;

    /// Recorded call frames, most recent first
    fn frames(&self) -> &[CallFrame];
}

/// Identity of a failure node: the address of the object, not its value
pub fn node_identity(node: &dyn Failure) -> *const () {
    node as *const _ as *const ()
}

/// Owned failure tree, as parsed from a printed JVM stack trace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Throwable {
    /// Exception type (e.g. `java.lang.IllegalStateException`)
    pub kind: String,
    /// Message after the `:` in the header line
    pub message: Option<String>,
    pub frames: Vec<CallFrame>,
    pub cause: Option<Box<Throwable>>,
    pub suppressed: Vec<Throwable>,
}

impl Throwable {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: None,
            frames: Vec::new(),
            cause: None,
            suppressed: Vec::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_frame(mut self, frame: CallFrame) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn with_cause(mut self, cause: Throwable) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn with_suppressed(mut self, suppressed: Throwable) -> Self {
        self.suppressed.push(suppressed);
        self
    }

    /// Header line as the JVM prints it
    pub fn header(&self) -> String {
        match &self.message {
            Some(message) => format!("{}: {}", self.kind, message),
            None => self.kind.clone(),
        }
    }
}

impl Drop for Throwable {
    // Cause chains from real crash reports can be far deeper than the stack
    fn drop(&mut self) {
        let mut pending: Vec<Throwable> = std::mem::take(&mut self.suppressed);
        if let Some(cause) = self.cause.take() {
            pending.push(*cause);
        }
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.suppressed);
            if let Some(cause) = node.cause.take() {
                pending.push(*cause);
            }
        }
    }
}

impl Failure for Throwable {
    fn cause(&self) -> Option<&dyn Failure> {
        self.cause.as_deref().map(|c| c as &dyn Failure)
    }

    fn suppressed(&self) -> Vec<&dyn Failure> {
        self.suppressed.iter().map(|s| s as &dyn Failure).collect()
    }

    fn frames(&self) -> &[CallFrame] {
        &self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_frame_display() {
        let frame = CallFrame::new("com.x.Foo")
            .with_method("bar")
            .with_source("Foo.java", Some(42));
        assert_eq!(frame.to_string(), "com.x.Foo.bar(Foo.java:42)");

        let frame = CallFrame::new("com.x.Foo").with_source("Foo.java", None);
        assert_eq!(frame.to_string(), "com.x.Foo(Foo.java)");
    }

    #[test]
    fn test_throwable_header() {
        assert_eq!(Throwable::new("java.lang.Error").header(), "java.lang.Error");
        assert_eq!(
            Throwable::new("java.lang.Error").with_message("boom").header(),
            "java.lang.Error: boom"
        );
    }

    #[test]
    fn test_throwable_failure_view() {
        let t = Throwable::new("A")
            .with_frame(CallFrame::new("com.x.Foo"))
            .with_cause(Throwable::new("B"))
            .with_suppressed(Throwable::new("C"))
            .with_suppressed(Throwable::new("D"));

        let node: &dyn Failure = &t;
        assert_eq!(node.frames().len(), 1);
        assert!(node.cause().is_some());
        assert_eq!(node.suppressed().len(), 2);
    }

    #[test]
    fn test_drop_deep_cause_chain() {
        let mut node = Throwable::new("leaf");
        for _ in 0..200_000 {
            node = Throwable::new("wrap").with_cause(node);
        }
        drop(node);
    }

    #[test]
    fn test_drop_deep_suppressed_nesting() {
        let mut node = Throwable::new("leaf");
        for _ in 0..200_000 {
            node = Throwable::new("wrap").with_suppressed(node);
        }
        drop(node);
    }

    #[test]
    fn test_identity_is_address_based() {
        let a = Throwable::new("same");
        let b = Throwable::new("same");
        assert_eq!(a, b);
        assert_ne!(node_identity(&a), node_identity(&b));
        assert_eq!(node_identity(&a), node_identity(&a));
    }
}
