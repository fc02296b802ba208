// Progress Estimation
// Derives a rough completion percentage from engine telemetry lines

/// Marker token that precedes the iteration counter, e.g. `it: 1234   Ar+: 0`
pub const ITERATION_MARKER: &str = "it:";

/// Estimate run progress from a single telemetry line.
///
/// Only the first `it:` token on the line is considered. The engine does not
/// report its iteration budget, so the counter is mapped onto 0..=100 with a
/// three-segment rule tuned for runs of roughly 1000 to 5000 iterations:
///
/// | iterations      | percent                        |
/// |-----------------|--------------------------------|
/// | `n <= 1000`     | `n / 10`                       |
/// | `n <= 5000`     | `10 + (n - 1000) / 40`         |
/// | `n > 5000`      | `90 + (n - 5000) / 500`        |
///
/// Every segment is capped at 100. The result is approximate: it can jump,
/// it is not guaranteed to be monotonic across lines, and a run may finish
/// well before or after the estimate reaches 100.
///
/// Returns `None` when the line carries no marker, when the marker is the
/// last token, or when the following token is not an unsigned integer.
pub fn estimate_progress(line: &str) -> Option<u8> {
    let mut tokens = line.split_whitespace();
    tokens.find(|token| *token == ITERATION_MARKER)?;
    let iteration = tokens.next()?.parse::<u64>().ok()?;
    Some(percent_for_iteration(iteration))
}

/// Map an iteration counter onto a percentage using the three-segment rule
pub fn percent_for_iteration(iteration: u64) -> u8 {
    let percent = if iteration <= 1000 {
        iteration / 10
    } else if iteration <= 5000 {
        10 + (iteration - 1000) / 40
    } else {
        90 + (iteration - 5000) / 500
    };
    percent.min(100) as u8
}
