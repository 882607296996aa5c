use crate::error::MisuseError;
use crate::task::stall;

/// Polls `poll` once per kernel round until it produces a value.
///
/// `poll` is called right away; while it returns `None` the task stalls and
/// tries again on its next turn. Turns "poll until ready" loops into
/// straight-line code.
///
/// # Errors
///
/// Returns [`MisuseError::StallOutsideTask`] if `poll` is not ready on the
/// first call and there is no task to stall.
///
/// # Examples
///
/// ```rust,ignore
/// let path = value(|| navmesh.borrow().find_path(from, to)).await?;
/// ```
pub async fn value<T, P>(mut poll: P) -> Result<T, MisuseError>
where
    P: FnMut() -> Option<T>,
{
    loop {
        if let Some(value) = poll() {
            return Ok(value);
        }

        stall()?.await;
    }
}
