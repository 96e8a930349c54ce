//! Include / alias call stack used for diagnostics

use std::path::{Path, PathBuf};

use crate::error::TraceEntry;

#[derive(Debug, Clone)]
pub struct Frame {
    /// Directory that relative paths resolve against
    pub working_dir: PathBuf,

    /// File path, `alias <name>` or a pseudo name
    pub name: String,

    /// Line in the parent frame that entered this one; none at the top
    pub caller_line: Option<u32>,

    /// Line of the statement currently executing
    pub line: u32,
}

#[derive(Debug, Default)]
pub struct FrameStack {
    frames: Vec<Frame>,
}

impl FrameStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, working_dir: impl Into<PathBuf>) {
        let caller_line = self.frames.last().map(|f| f.line);
        self.frames.push(Frame {
            working_dir: working_dir.into(),
            name: name.into(),
            caller_line,
            line: 0,
        });
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn set_line(&mut self, line: u32) {
        if let Some(frame) = self.frames.last_mut() {
            frame.line = line;
        }
    }

    /// Working directory of the innermost frame
    pub fn working_dir(&self) -> &Path {
        self.frames
            .last()
            .map(|f| f.working_dir.as_path())
            .unwrap_or_else(|| Path::new("."))
    }

    /// Innermost-first snapshot
    pub fn trace(&self) -> Vec<TraceEntry> {
        self.frames
            .iter()
            .rev()
            .map(|f| TraceEntry {
                frame: f.name.clone(),
                line: f.line,
                caller_line: f.caller_line,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_is_innermost_first() {
        let mut frames = FrameStack::new();
        frames.push("main.ui", "/scripts");
        frames.set_line(7);
        frames.push("alias login", "/scripts");
        frames.set_line(2);

        assert_eq!(frames.current().and_then(|f| f.caller_line), Some(7));
        let trace = frames.trace();
        assert_eq!(
            trace[0],
            TraceEntry { frame: "alias login".into(), line: 2, caller_line: Some(7) }
        );
        assert_eq!(
            trace[1],
            TraceEntry { frame: "main.ui".into(), line: 7, caller_line: None }
        );

        frames.pop();
        assert_eq!(frames.depth(), 1);
        assert_eq!(frames.working_dir(), Path::new("/scripts"));
    }
}
