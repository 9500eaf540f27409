// Cross-cutting prompt fragments. Each service that builds business prompts keeps
// them next to its own code (see `cv::prompts`).

/// Minimal prompt used only to decide whether any model answers at all.
pub const CONNECTIVITY_PROBE: &str = "Reply with just 'OK'";
