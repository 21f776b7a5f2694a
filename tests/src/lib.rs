//! End-to-end checks of the scan pipeline: request resolution, privilege
//! pre-flight, per-technique probing and result aggregation. Raw probes run
//! against scripted targets so no privileges or network are needed.

#[cfg(test)]
mod support;

#[cfg(test)]
mod scan;
