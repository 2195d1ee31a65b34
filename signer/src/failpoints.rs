use fail::fail_point;

use crate::bail;
use crate::error::SignerResult;

pub const FIRST_HASH__AFTER_EXPENSIVE: &str = "first_hash.after_expensive";
pub const MULTI_HASH__BEFORE_EMIT: &str = "multi_hash.before_emit";
pub const COMBINE__BEFORE_EMIT: &str = "combine.before_emit";

/// Evaluates the fail point `name`.
///
/// Without the `failpoints` feature the fail point compiles away and this always succeeds.
/// With it, a fail point configured with `return` produces an `InjectedFailure` error.
pub fn signer_fail_point(name: &str) -> SignerResult<()> {
    fail_point!(name, |parameter| {
        let detail = match parameter {
            Some(parameter) => format!("The failpoint '{name}' returned an error: {parameter}"),
            None => format!("The failpoint '{name}' returned an error"),
        };

        bail!(
            crate::error::ErrorKind::InjectedFailure,
            "An error occurred in a fail point",
            detail = detail
        );
    });

    Ok(())
}
