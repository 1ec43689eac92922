/// Recommended error type for a scenario binary's `main` function.
pub type StressTunnelResult<T> = anyhow::Result<T>;
