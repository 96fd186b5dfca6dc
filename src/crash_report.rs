//! Parsing of printed JVM stack traces
//!
//! Understands the layout `Throwable.printStackTrace` produces:
//!
//! ```text
//! java.lang.RuntimeException: boom
//! 	at com.x.Foo.run(Foo.java:10)
//! 	Suppressed: java.lang.IllegalStateException: cleanup failed
//! 		at com.z.Baz.close(Baz.java:3)
//! 		... 1 more
//! Caused by: java.lang.NullPointerException
//! 	at com.y.Bar.get(Bar.java:20)
//! 	... 1 more
//! ```
//!
//! A `Suppressed:` caption sits one level deeper than the failure it belongs
//! to; `Caused by:` sits at the same level as the failure it explains.
//! Indentation is tabs, with runs of four spaces accepted as one level.

use crate::failure::{CallFrame, Throwable};
use anyhow::{bail, Result};
use regex::Regex;
use std::sync::LazyLock;

const CAUSED_BY: &str = "Caused by:";
const SUPPRESSED: &str = "Suppressed:";

static HEADER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<kind>[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*)(?::\s?(?P<message>.*))?$")
        .expect("header pattern is valid")
});

static FRAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^at\s+(?P<target>[^\s(]+)(?:\((?P<source>[^)]*)\))?")
        .expect("frame pattern is valid")
});

/// Failure under construction; children are arena indices
struct PendingNode {
    kind: String,
    message: Option<String>,
    frames: Vec<CallFrame>,
    cause: Option<usize>,
    suppressed: Vec<usize>,
    depth: usize,
}

impl PendingNode {
    fn from_header(header: &str, depth: usize) -> Option<Self> {
        let caps = HEADER_PATTERN.captures(header.trim())?;
        Some(Self {
            kind: caps["kind"].to_string(),
            message: caps.name("message").map(|m| m.as_str().to_string()),
            frames: Vec::new(),
            cause: None,
            suppressed: Vec::new(),
            depth,
        })
    }

    fn is_bare(&self) -> bool {
        self.frames.is_empty() && self.cause.is_none() && self.suppressed.is_empty()
    }
}

fn indent_depth(line: &str) -> usize {
    let mut tabs: usize = 0;
    let mut spaces: usize = 0;
    for c in line.chars() {
        match c {
            '\t' => tabs += 1,
            ' ' => spaces += 1,
            _ => break,
        }
    }
    tabs + spaces.div_ceil(4)
}

/// Drop class loader and module qualifiers (`app//a.B.c`, `java.base/a.B.c`,
/// `loader/mod@1.0/a.B.c`). A `/0x...` segment is a hidden class suffix and
/// stays with the class name.
fn strip_qualifiers(target: &str) -> &str {
    let mut start = 0;
    let mut offset = 0;
    for segment in target.split('/') {
        if offset > 0 && segment.starts_with("0x") {
            break;
        }
        start = offset;
        offset += segment.len() + 1;
    }
    &target[start..]
}

/// Parse a `\tat ...` frame line (without indentation)
pub fn parse_frame(line: &str) -> Option<CallFrame> {
    let caps = FRAME_PATTERN.captures(line.trim())?;

    let qualified = strip_qualifiers(&caps["target"]);

    let (unit, method) = match qualified.rsplit_once('.') {
        Some((unit, method)) if !unit.is_empty() => (unit, Some(method)),
        _ => (qualified, None),
    };
    if unit.is_empty() {
        return None;
    }

    let mut frame = CallFrame::new(unit);
    if let Some(method) = method {
        frame = frame.with_method(method);
    }
    if let Some(source) = caps.name("source") {
        let source = source.as_str();
        match source.rsplit_once(':') {
            Some((file, line)) => {
                frame = frame.with_source(file, line.trim().parse().ok());
            }
            None => frame = frame.with_source(source, None),
        }
    }
    Some(frame)
}

/// Parse a printed stack trace whose first non-blank line is the root header
///
/// Parsing stops at the first blank line or at a line that doesn't belong to
/// a stack trace.
pub fn parse_stack_trace(text: &str) -> Result<Throwable> {
    let mut lines = text.lines().map(|l| l.trim_end()).skip_while(|l| l.is_empty());

    let Some(header) = lines.next() else {
        bail!("Empty stack trace");
    };
    let base = indent_depth(header);
    let Some(root) = PendingNode::from_header(header, 0) else {
        bail!("Not a stack trace header: {}", header.trim());
    };

    let mut arena = vec![root];
    let mut open: Vec<usize> = vec![0];

    for line in lines {
        if line.trim().is_empty() {
            break;
        }
        let indent = indent_depth(line);
        if indent < base {
            break;
        }
        let depth = indent - base;
        let content = line.trim_start();

        if content.starts_with("at ") || content.starts_with("...") {
            let Some(owner) = depth.checked_sub(1).and_then(|d| find_open(&mut open, &arena, d)) else {
                bail!("Frame outside of any failure: {}", content);
            };
            if let Some(frame) = parse_frame(content) {
                arena[owner].frames.push(frame);
            }
        } else if let Some(rest) = content.strip_prefix(CAUSED_BY) {
            let Some(effect) = find_open(&mut open, &arena, depth) else {
                bail!("'Caused by' without a matching failure: {}", content);
            };
            let Some(node) = PendingNode::from_header(rest, depth) else {
                bail!("Malformed cause header: {}", content);
            };
            let idx = arena.len();
            arena.push(node);
            arena[effect].cause = Some(idx);
            // The explained failure can't receive more frames once its cause starts
            open.pop();
            open.push(idx);
        } else if let Some(rest) = content.strip_prefix(SUPPRESSED) {
            let Some(owner) = depth.checked_sub(1).and_then(|d| find_open(&mut open, &arena, d)) else {
                bail!("'Suppressed' without an enclosing failure: {}", content);
            };
            let Some(node) = PendingNode::from_header(rest, depth) else {
                bail!("Malformed suppressed header: {}", content);
            };
            let idx = arena.len();
            arena.push(node);
            arena[owner].suppressed.push(idx);
            open.push(idx);
        } else {
            // Continuation of a multi-line message, if nothing follows the header yet
            let last = arena.len() - 1;
            if open.last() == Some(&last) && arena[last].is_bare() {
                match &mut arena[last].message {
                    Some(message) => {
                        message.push('\n');
                        message.push_str(line);
                    }
                    None => arena[last].message = Some(line.to_string()),
                }
            } else {
                break;
            }
        }
    }

    Ok(assemble(arena))
}

/// Close open failures nested deeper than `depth`; returns the open failure
/// at exactly `depth`
fn find_open(open: &mut Vec<usize>, arena: &[PendingNode], depth: usize) -> Option<usize> {
    while let Some(&top) = open.last() {
        if arena[top].depth > depth {
            open.pop();
        } else {
            break;
        }
    }
    open.last().copied().filter(|&top| arena[top].depth == depth)
}

/// Build the owned tree. Children always come after their parent in the
/// arena, so building back to front sees every child before its parent.
fn assemble(arena: Vec<PendingNode>) -> Throwable {
    let mut built: Vec<Option<Throwable>> = Vec::with_capacity(arena.len());
    built.resize_with(arena.len(), || None);

    for (idx, pending) in arena.into_iter().enumerate().rev() {
        let cause = pending
            .cause
            .and_then(|c| built[c].take())
            .map(Box::new);
        let suppressed = pending
            .suppressed
            .iter()
            .filter_map(|&s| built[s].take())
            .collect();
        built[idx] = Some(Throwable {
            kind: pending.kind,
            message: pending.message,
            frames: pending.frames,
            cause,
            suppressed,
        });
    }

    built
        .into_iter()
        .next()
        .flatten()
        .unwrap_or_default()
}

fn is_header_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.starts_with("at ") && HEADER_PATTERN.is_match(trimmed)
}

/// Find and parse the first stack trace inside a larger document, such as a
/// game crash report
///
/// A stack trace starts at a header line immediately followed by a frame
/// line.
pub fn find_stack_trace(text: &str) -> Result<Throwable> {
    let lines: Vec<&str> = text.lines().collect();
    for (i, pair) in lines.windows(2).enumerate() {
        if is_header_line(pair[0]) && pair[1].trim_start().starts_with("at ") {
            return parse_stack_trace(&lines[i..].join("\n"));
        }
    }
    bail!("No stack trace found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::Failure;

    const NESTED: &str = "java.lang.RuntimeException: boom
\tat com.x.Foo.run(Foo.java:10)
\tat net.minecraft.server.Main.main(Main.java:5)
\tSuppressed: java.lang.IllegalStateException: cleanup failed
\t\tat com.z.Baz.close(Baz.java:3)
\t\t... 1 more
\tCaused by: java.io.IOException
\t\tat com.z.Io.read(Io.java:7)
\t\t... 2 more
Caused by: java.lang.NullPointerException
\tat com.y.Bar.get(Bar.java:20)
\t... 1 more
";

    #[test]
    fn test_parse_frame_variants() {
        let frame = parse_frame("at com.x.Foo.run(Foo.java:10)").unwrap();
        assert_eq!(frame.unit, "com.x.Foo");
        assert_eq!(frame.method.as_deref(), Some("run"));
        assert_eq!(frame.file.as_deref(), Some("Foo.java"));
        assert_eq!(frame.line, Some(10));

        let frame = parse_frame("at java.base/java.lang.Thread.run(Thread.java:833)").unwrap();
        assert_eq!(frame.unit, "java.lang.Thread");

        let frame = parse_frame("at app//com.x.Foo$Inner.<init>(Foo.java:3)").unwrap();
        assert_eq!(frame.unit, "com.x.Foo$Inner");
        assert_eq!(frame.method.as_deref(), Some("<init>"));

        let frame = parse_frame("at sun.misc.Unsafe.park(Native Method)").unwrap();
        assert_eq!(frame.file.as_deref(), Some("Native Method"));
        assert_eq!(frame.line, None);

        let frame =
            parse_frame("at com.x.Foo.tick(Foo.java:42) ~[examplemod-1.0.jar:?] {re:mixin}").unwrap();
        assert_eq!(frame.unit, "com.x.Foo");
        assert_eq!(frame.line, Some(42));

        assert!(parse_frame("... 3 more").is_none());
    }

    #[test]
    fn test_parse_hidden_class_frames() {
        let frame = parse_frame("at com.x.Foo$$Lambda$12/0x0000000800c0b0.run(Unknown Source)").unwrap();
        assert_eq!(frame.unit, "com.x.Foo$$Lambda$12/0x0000000800c0b0");
        assert_eq!(frame.method.as_deref(), Some("run"));

        let frame = parse_frame(
            "at java.base/java.lang.invoke.LambdaForm$DMH/0x0000000800c44000.invokeVirtual(LambdaForm$DMH)",
        )
        .unwrap();
        assert_eq!(frame.unit, "java.lang.invoke.LambdaForm$DMH/0x0000000800c44000");

        let frame = parse_frame("at app//com.x.Foo$$Lambda$3/0x01.accept(Unknown Source)").unwrap();
        assert_eq!(frame.unit, "com.x.Foo$$Lambda$3/0x01");

        let frame = parse_frame("at com.foo.loader/foo@9.0/com.foo.Main.run(Main.java:101)").unwrap();
        assert_eq!(frame.unit, "com.foo.Main");
    }

    #[test]
    fn test_parse_and_drop_deep_cause_chain() {
        let mut text = String::from("java.lang.RuntimeException: top\n\tat com.x.Foo.run(Foo.java:1)\n");
        for i in 0..200_000 {
            text.push_str(&format!("Caused by: java.lang.IllegalStateException: level {}\n", i));
            text.push_str("\tat com.x.Foo.run(Foo.java:1)\n");
        }
        let root = parse_stack_trace(&text).unwrap();

        let mut depth = 0;
        let mut current: Option<&dyn Failure> = Some(&root);
        while let Some(node) = current {
            depth += 1;
            current = node.cause();
        }
        assert_eq!(depth, 200_001);
        drop(root);
    }

    #[test]
    fn test_parse_nested_trace() {
        let root = parse_stack_trace(NESTED).unwrap();
        assert_eq!(root.kind, "java.lang.RuntimeException");
        assert_eq!(root.message.as_deref(), Some("boom"));
        assert_eq!(root.frames.len(), 2);

        assert_eq!(root.suppressed.len(), 1);
        let suppressed = &root.suppressed[0];
        assert_eq!(suppressed.kind, "java.lang.IllegalStateException");
        assert_eq!(suppressed.frames[0].unit, "com.z.Baz");
        let suppressed_cause = suppressed.cause.as_deref().unwrap();
        assert_eq!(suppressed_cause.kind, "java.io.IOException");
        assert_eq!(suppressed_cause.frames[0].unit, "com.z.Io");

        let cause = root.cause().unwrap();
        assert_eq!(cause.frames()[0].unit, "com.y.Bar");
        assert!(cause.cause().is_none());
    }

    #[test]
    fn test_multiline_message() {
        let text = "java.lang.IllegalStateException: first line\nsecond line\n\tat com.x.Foo.run(Foo.java:1)\n";
        let root = parse_stack_trace(text).unwrap();
        assert_eq!(root.message.as_deref(), Some("first line\nsecond line"));
        assert_eq!(root.frames.len(), 1);
    }

    #[test]
    fn test_space_indentation() {
        let text = "java.lang.Error\n    at com.x.Foo.run(Foo.java:1)\n    Suppressed: java.lang.Error\n        at com.z.Baz.run(Baz.java:1)\nCaused by: java.lang.Error\n    at com.y.Bar.run(Bar.java:1)\n";
        let root = parse_stack_trace(text).unwrap();
        assert_eq!(root.suppressed[0].frames[0].unit, "com.z.Baz");
        assert_eq!(root.cause.as_deref().unwrap().frames[0].unit, "com.y.Bar");
    }

    #[test]
    fn test_stops_at_blank_line() {
        let text = "java.lang.Error\n\tat a.B.c(B.java:1)\n\n\tat d.E.f(E.java:2)\n";
        let root = parse_stack_trace(text).unwrap();
        assert_eq!(root.frames.len(), 1);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_stack_trace("").is_err());
        assert!(parse_stack_trace("-- not a header --").is_err());
        assert!(parse_stack_trace("java.lang.Error\nCaused by: \n").is_err());
        assert!(parse_stack_trace("java.lang.Error\n\t\tSuppressed: java.lang.Error\n").is_err());
    }

    #[test]
    fn test_find_stack_trace_in_crash_report() {
        let report = "---- Minecraft Crash Report ----
// Why did you do that?

Time: 2024-01-01 12:00:00
Description: Ticking entity

java.lang.NullPointerException: Ticking entity
\tat com.x.Foo.tick(Foo.java:42)
\tat net.minecraft.world.World.tick(World.java:100)
Caused by: java.lang.IllegalStateException
\tat com.y.Bar.get(Bar.java:7)


A detailed walkthrough of the error, its code path and all known details is as follows:
";
        let root = find_stack_trace(report).unwrap();
        assert_eq!(root.kind, "java.lang.NullPointerException");
        assert_eq!(root.frames.len(), 2);
        assert_eq!(root.cause.as_deref().unwrap().frames[0].unit, "com.y.Bar");
    }

    #[test]
    fn test_find_stack_trace_none() {
        assert!(find_stack_trace("nothing to see here\njust text\n").is_err());
    }
}
