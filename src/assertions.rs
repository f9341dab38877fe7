//! Comparison helpers for integration tests.
//!
//! Amounts are compared as arbitrary-precision integers and addresses by
//! their base58 form, so values of different widths or representations can
//! be checked against each other.

use std::future::Future;

use num_bigint::BigInt;
use thiserror::Error;
use tracing::info;

use crate::prelude::*;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind} mismatch: left `{left}`, right `{right}`")]
pub struct Mismatch {
    pub kind: &'static str,
    pub left: String,
    pub right: String,
}

fn check_canonical(kind: &'static str, left: String, right: String) -> Result<(), Mismatch> {
    if left == right {
        return Ok(());
    }

    Err(Mismatch { kind, left, right })
}

pub fn check_amount_eq(a: impl Into<BigInt>, b: impl Into<BigInt>) -> Result<(), Mismatch> {
    check_canonical("amount", a.into().to_string(), b.into().to_string())
}

pub fn check_pubkey_eq(a: &Pubkey, b: &Pubkey) -> Result<(), Mismatch> {
    check_canonical("address", a.to_string(), b.to_string())
}

/// Panic unless both amounts are numerically equal
#[track_caller]
pub fn require_amount_eq(a: impl Into<BigInt>, b: impl Into<BigInt>) {
    let (a, b) = (a.into().to_string(), b.into().to_string());
    assert_eq!(a, b, "amount mismatch");
}

#[track_caller]
pub fn require_pubkey_eq(a: &Pubkey, b: &Pubkey) {
    assert_eq!(a.to_string(), b.to_string(), "address mismatch");
}

/// Await a call that must be rejected by the clearing house program.
///
/// The rejection is logged and handed back for further checks. A call that
/// succeeds, or that fails for any reason other than a program rejection,
/// panics.
pub async fn expect_program_error<T, E, F>(call: F) -> ProgramError
where
    F: Future<Output = Result<T, E>>,
    E: Into<Error>,
{
    let result: Result<T, Error> = call.await.map_err(Into::into);

    match result {
        Ok(_) => panic!("expected the call to be rejected by the program, but it succeeded"),
        Err(Error::Application(err)) => {
            info!(
                code = err.code(),
                name = err.name(),
                %err,
                "program rejected the call as expected"
            );
            err
        }
        Err(other) => panic!("expected a program rejection, got: {other}"),
    }
}

/// Like [`expect_program_error`], also requiring a specific error code
pub async fn expect_program_error_code<T, E, F>(call: F, code: u32) -> ProgramError
where
    F: Future<Output = Result<T, E>>,
    E: Into<Error>,
{
    let err = expect_program_error(call).await;

    assert_eq!(
        err.code(),
        code,
        "unexpected program error {} ({})",
        err.name(),
        err
    );

    err
}
