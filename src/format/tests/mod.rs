//! Tests for the label codec and dataset export.
//!
//! These cover the text formats, the parse side of both formats and the
//! zip/directory writers.
