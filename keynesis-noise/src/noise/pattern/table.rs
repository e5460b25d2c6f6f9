use super::Token::{self, *};

pub(super) struct Entry {
    pub(super) name: &'static str,
    pub(super) initiator: &'static [Token],
    pub(super) responder: &'static [Token],
    pub(super) messages: &'static [&'static [Token]],
}

const fn entry(
    name: &'static str,
    initiator: &'static [Token],
    responder: &'static [Token],
    messages: &'static [&'static [Token]],
) -> Entry {
    Entry {
        name,
        initiator,
        responder,
        messages,
    }
}

/// the base handshake patterns, messages alternate between the initiator
/// (even index) and the responder (odd index)
pub(super) const PATTERNS: &[Entry] = &[
    // one-way
    entry("N", &[], &[S], &[&[E, ES]]),
    entry("K", &[S], &[S], &[&[E, ES, SS]]),
    entry("X", &[], &[S], &[&[E, ES, S, SS]]),
    // interactive
    entry("NN", &[], &[], &[&[E], &[E, EE]]),
    entry("NK", &[], &[S], &[&[E, ES], &[E, EE]]),
    entry("NX", &[], &[], &[&[E], &[E, EE, S, ES]]),
    entry("KN", &[S], &[], &[&[E], &[E, EE, SE]]),
    entry("KK", &[S], &[S], &[&[E, ES, SS], &[E, EE, SE]]),
    entry("KX", &[S], &[], &[&[E], &[E, EE, SE, S, ES]]),
    entry("XN", &[], &[], &[&[E], &[E, EE], &[S, SE]]),
    entry("XK", &[], &[S], &[&[E, ES], &[E, EE], &[S, SE]]),
    entry("XX", &[], &[], &[&[E], &[E, EE, S, ES], &[S, SE]]),
    entry("IN", &[], &[], &[&[E, S], &[E, EE, SE]]),
    entry("IK", &[], &[S], &[&[E, ES, S, SS], &[E, EE, SE]]),
    entry("IX", &[], &[], &[&[E, S], &[E, EE, SE, S, ES]]),
    // deferred
    entry("NK1", &[], &[S], &[&[E], &[E, EE, ES]]),
    entry("NX1", &[], &[], &[&[E], &[E, EE, S], &[ES]]),
    entry("X1N", &[], &[], &[&[E], &[E, EE], &[S], &[SE]]),
    entry("X1K", &[], &[S], &[&[E, ES], &[E, EE], &[S], &[SE]]),
    entry("XK1", &[], &[S], &[&[E], &[E, EE, ES], &[S, SE]]),
    entry("X1K1", &[], &[S], &[&[E], &[E, EE, ES], &[S], &[SE]]),
    entry("X1X", &[], &[], &[&[E], &[E, EE, S, ES], &[S], &[SE]]),
    entry("XX1", &[], &[], &[&[E], &[E, EE, S], &[ES, S, SE]]),
    entry("X1X1", &[], &[], &[&[E], &[E, EE, S], &[ES, S], &[SE]]),
    entry("K1N", &[S], &[], &[&[E], &[E, EE], &[SE]]),
    entry("K1K", &[S], &[S], &[&[E, ES], &[E, EE], &[SE]]),
    entry("KK1", &[S], &[S], &[&[E], &[E, EE, SE, ES]]),
    entry("K1K1", &[S], &[S], &[&[E], &[E, EE, ES], &[SE]]),
    entry("K1X", &[S], &[], &[&[E], &[E, EE, S, ES], &[SE]]),
    entry("KX1", &[S], &[], &[&[E], &[E, EE, SE, S], &[ES]]),
    entry("K1X1", &[S], &[], &[&[E], &[E, EE, S], &[SE, ES]]),
    entry("I1N", &[], &[], &[&[E, S], &[E, EE], &[SE]]),
    entry("I1K", &[], &[S], &[&[E, ES, S], &[E, EE], &[SE]]),
    entry("IK1", &[], &[S], &[&[E, S], &[E, EE, SE, ES]]),
    entry("I1K1", &[], &[S], &[&[E, S], &[E, EE, ES], &[SE]]),
    entry("I1X", &[], &[], &[&[E, S], &[E, EE, S, ES], &[SE]]),
    entry("IX1", &[], &[], &[&[E, S], &[E, EE, SE, S], &[ES]]),
    entry("I1X1", &[], &[], &[&[E, S], &[E, EE, S], &[SE, ES]]),
];

pub(super) fn lookup(name: &str) -> Option<&'static Entry> {
    PATTERNS.iter().find(|entry| entry.name == name)
}
