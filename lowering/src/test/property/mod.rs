//! Property-based tests for the lowering pipeline.
//!
//! Every generated site is evaluated before and after lowering with the test
//! interpreter; the lowered graph must produce the same quantized values.
