//! Overload ranking.
//!
//! A call with `n` arguments first narrows to overloads that accept `n`
//! arguments of the given types. Overloads that declare exactly `n`
//! parameters beat ones that only reach `n` by omitting optionals or
//! repeating a variadic tail. Within a tier, an overload wins if it is
//! positionally at least as specific as every other candidate.
//!
//! The same ranking is applied to declared parameter types at registry
//! construction: if two overloads could both receive some argument list and
//! neither is more specific, the surface itself is ambiguous.

use crate::api_registry::Signature;
use crate::error::ResolveError;
use crate::value_types::{Primitive, ValueType};

/// Two overloads that tie for some argument count.
#[derive(Debug)]
pub(crate) struct Conflict<'a> {
    pub first: &'a Signature,
    pub second: &'a Signature,
    pub arity: usize,
}

/// An explicit `nil` fills position `i` (optional parameters and variadic tails).
fn takes_nil_at(sig: &Signature, i: usize) -> bool {
    sig.params.get(i).map_or(true, |p| p.optional)
}

fn accepts_args(sig: &Signature, args: &[ValueType]) -> bool {
    sig.accepts_arity(args.len())
        && args.iter().enumerate().all(|(i, &arg)| {
            match sig.param_type_at(i) {
                Some(_) if arg.base() == Primitive::Nil && takes_nil_at(sig, i) => true,
                Some(param) => param.accepts(arg),
                None => false,
            }
        })
}

/// `a` is at least as specific as `b` on the first `n` positions.
fn at_least_as_specific(a: &Signature, b: &Signature, n: usize) -> bool {
    (0..n).all(|i| match (a.param_type_at(i), b.param_type_at(i)) {
        (Some(ta), Some(tb)) => ta.is_narrower_or_equal(tb),
        _ => false,
    })
}

/// Some argument list of length `n` is accepted by both `a` and `b`.
fn overlap_at(a: &Signature, b: &Signature, n: usize) -> bool {
    a.accepts_arity(n)
        && b.accepts_arity(n)
        && (0..n).all(|i| match (a.param_type_at(i), b.param_type_at(i)) {
            (Some(ta), Some(tb)) => {
                ta.overlaps(tb) || (takes_nil_at(a, i) && takes_nil_at(b, i))
            }
            _ => false,
        })
}

/// Find the first pair of overloads that tie for some argument count.
pub(crate) fn find_conflict<'a>(overloads: &[&'a Signature]) -> Option<Conflict<'a>> {
    for (i, &a) in overloads.iter().enumerate() {
        for &b in &overloads[i + 1..] {
            // Past the longer parameter list only variadic tails repeat.
            let longest = a.params.len().max(b.params.len()) + 1;
            for n in 0..=longest {
                if !overlap_at(a, b, n) || a.is_exact_arity(n) != b.is_exact_arity(n) {
                    continue;
                }
                if at_least_as_specific(a, b, n) == at_least_as_specific(b, a, n) {
                    return Some(Conflict {
                        first: a,
                        second: b,
                        arity: n,
                    });
                }
            }
        }
    }
    None
}

fn describe_args(args: &[ValueType]) -> String {
    args.iter()
        .map(|ty| ty.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pick the overload a call with `args` dispatches to.
pub(crate) fn select<'a>(
    path: &str,
    overloads: &[&'a Signature],
    args: &[ValueType],
) -> Result<&'a Signature, ResolveError> {
    let n = args.len();
    let mut candidates: Vec<&'a Signature> = overloads
        .iter()
        .copied()
        .filter(|sig| accepts_args(sig, args))
        .collect();

    if candidates.is_empty() {
        return Err(ResolveError::NoMatchingOverload {
            path: path.to_string(),
            args: describe_args(args),
        });
    }

    if candidates.iter().any(|sig| sig.is_exact_arity(n)) {
        candidates.retain(|sig| sig.is_exact_arity(n));
    }

    let best: Vec<&'a Signature> = candidates
        .iter()
        .copied()
        .filter(|a| {
            candidates
                .iter()
                .all(|b| std::ptr::eq(*a, *b) || at_least_as_specific(a, b, n))
        })
        .collect();

    match best.as_slice() {
        [winner] => Ok(*winner),
        _ => Err(ResolveError::Ambiguous {
            path: path.to_string(),
            args: describe_args(args),
            candidates: candidates.iter().map(|sig| sig.to_string()).collect(),
        }),
    }
}
