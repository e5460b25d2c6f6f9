/*!
# Noise Handshake patterns

All the handshake patterns of the [Noise Specification] are available, the
fundamental patterns (`N`, `K`, `X`, `NN`, `XX`, `IK`...) and the deferred
ones (`X1K`, `I1K1`...). A pattern is looked up by name and can be
altered with `psk` modifiers (`XXpsk3`, `NNpsk0+psk2`).

Before using any of these you should look at the [Noise Explorer] to
understand the security properties of each handshake.

[Noise Specification]: http://noiseprotocol.org/noise.html
[Noise Explorer]: https://noiseexplorer.com/patterns/
*/
mod table;

use crate::noise::Role;
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    E,
    S,
    EE,
    ES,
    SE,
    SS,
    Psk,
}

/// the tokens processed by one handshake message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePattern {
    tokens: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakePattern {
    name: String,
    initiator: Vec<Token>,
    responder: Vec<Token>,
    messages: Vec<MessagePattern>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("Unknown handshake pattern {0:?}")]
    UnknownPattern(String),

    #[error("Unsupported pattern modifier {0:?}")]
    UnsupportedModifier(String),

    #[error("Cannot apply psk{position}, the pattern only has {messages} messages")]
    InvalidPskPosition { position: usize, messages: usize },
}

impl MessagePattern {
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn contains(&self, token: Token) -> bool {
        self.tokens.contains(&token)
    }
}

impl HandshakePattern {
    /// the pattern name, modifiers included (`XXpsk3`)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// tokens of the keys known by the responder before the handshake
    pub fn initiator_pre_messages(&self) -> &[Token] {
        &self.initiator
    }

    /// tokens of the keys known by the initiator before the handshake
    pub fn responder_pre_messages(&self) -> &[Token] {
        &self.responder
    }

    pub fn messages(&self) -> &[MessagePattern] {
        &self.messages
    }

    pub fn message(&self, index: usize) -> Option<&MessagePattern> {
        self.messages.get(index)
    }

    /// a one-way pattern is made of a single message, from the initiator
    /// to the responder
    pub fn is_one_way(&self) -> bool {
        self.messages.len() == 1
    }

    pub fn psk_count(&self) -> usize {
        self.messages
            .iter()
            .flat_map(|message| message.tokens())
            .filter(|token| **token == Token::Psk)
            .count()
    }

    pub fn has_psk(&self) -> bool {
        self.psk_count() > 0
    }

    /// the role writing the message at the given index
    pub fn writer(index: usize) -> Role {
        if index % 2 == 0 {
            Role::Initiator
        } else {
            Role::Responder
        }
    }

    fn pre_messages(&self, role: Role) -> &[Token] {
        match role {
            Role::Initiator => &self.initiator,
            Role::Responder => &self.responder,
        }
    }

    fn writes(&self, role: Role, token: Token) -> bool {
        self.messages
            .iter()
            .enumerate()
            .any(|(index, message)| Self::writer(index) == role && message.contains(token))
    }

    /// the local static key is needed if it is pre-shared or sent during
    /// the handshake
    pub fn local_static_required(&self, role: Role) -> bool {
        self.pre_messages(role).contains(&Token::S) || self.writes(role, Token::S)
    }

    /// the remote static key needs to be known before the handshake
    pub fn remote_static_required(&self, role: Role) -> bool {
        self.pre_messages(role.other()).contains(&Token::S)
    }

    fn apply_modifier(&mut self, modifier: &str) -> Result<(), PatternError> {
        let position = modifier
            .strip_prefix("psk")
            .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or_else(|| PatternError::UnsupportedModifier(modifier.to_owned()))?;

        let messages = self.messages.len();
        if position > messages {
            return Err(PatternError::InvalidPskPosition { position, messages });
        }

        if position == 0 {
            self.messages[0].tokens.insert(0, Token::Psk);
        } else {
            self.messages[position - 1].tokens.push(Token::Psk);
        }
        Ok(())
    }
}

impl FromStr for HandshakePattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s
            .find(|c: char| c.is_ascii_lowercase())
            .unwrap_or(s.len());
        let (base, modifiers) = s.split_at(split);

        let entry =
            table::lookup(base).ok_or_else(|| PatternError::UnknownPattern(base.to_owned()))?;

        let mut pattern = Self {
            name: s.to_owned(),
            initiator: entry.initiator.to_vec(),
            responder: entry.responder.to_vec(),
            messages: entry
                .messages
                .iter()
                .map(|tokens| MessagePattern {
                    tokens: tokens.to_vec(),
                })
                .collect(),
        };

        if !modifiers.is_empty() {
            for modifier in modifiers.split('+') {
                pattern.apply_modifier(modifier)?;
            }
        }

        Ok(pattern)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Self::E => "e",
            Self::S => "s",
            Self::EE => "ee",
            Self::ES => "es",
            Self::SE => "se",
            Self::SS => "ss",
            Self::Psk => "psk",
        };
        f.write_str(token)
    }
}

impl fmt::Display for HandshakePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use Token::*;

    /// names of all the base patterns
    pub fn names() -> impl Iterator<Item = &'static str> {
        table::PATTERNS.iter().map(|entry| entry.name)
    }

    fn parse(name: &str) -> HandshakePattern {
        name.parse().unwrap()
    }

    fn tokens(pattern: &HandshakePattern, index: usize) -> &[Token] {
        pattern.message(index).unwrap().tokens()
    }

    #[test]
    fn all_patterns_parse() {
        for entry in table::PATTERNS {
            let pattern = parse(entry.name);
            assert_eq!(pattern.name(), entry.name);
            assert_eq!(pattern.to_string(), entry.name);
            assert_eq!(pattern.messages().len(), entry.messages.len());
            assert!(!pattern.has_psk());
        }
    }

    #[test]
    fn one_way_patterns() {
        let one_way: Vec<_> = table::PATTERNS
            .iter()
            .filter(|entry| parse(entry.name).is_one_way())
            .map(|entry| entry.name)
            .collect();
        assert_eq!(one_way, vec!["N", "K", "X"]);
    }

    /// replay each pattern and check every DH token only uses keys that
    /// are known at that point
    #[test]
    fn tokens_only_use_known_keys() {
        for entry in table::PATTERNS {
            let pattern = parse(entry.name);
            // (e, s) known for the initiator then the responder
            let mut keys = [
                (false, pattern.initiator_pre_messages().contains(&S)),
                (false, pattern.responder_pre_messages().contains(&S)),
            ];

            for (index, message) in pattern.messages().iter().enumerate() {
                let writer = HandshakePattern::writer(index) as usize;
                for token in message.tokens() {
                    let (i, r) = (keys[0], keys[1]);
                    match token {
                        E => {
                            assert!(!keys[writer].0, "{}: e sent twice", entry.name);
                            keys[writer].0 = true;
                        }
                        S => {
                            assert!(!keys[writer].1, "{}: s sent twice", entry.name);
                            keys[writer].1 = true;
                        }
                        EE => assert!(i.0 && r.0, "{}: ee", entry.name),
                        ES => assert!(i.0 && r.1, "{}: es", entry.name),
                        SE => assert!(i.1 && r.0, "{}: se", entry.name),
                        SS => assert!(i.1 && r.1, "{}: ss", entry.name),
                        Psk => unreachable!(),
                    }
                }
            }
        }
    }

    #[test]
    fn psk0_is_prepended_to_the_first_message() {
        let pattern = parse("NNpsk0");
        assert_eq!(tokens(&pattern, 0), &[Psk, E]);
        assert_eq!(tokens(&pattern, 1), &[E, EE]);
        assert_eq!(pattern.psk_count(), 1);
    }

    #[test]
    fn psk_n_is_appended_to_the_nth_message() {
        let pattern = parse("XXpsk3");
        assert_eq!(tokens(&pattern, 2), &[S, SE, Psk]);

        let pattern = parse("NNpsk0+psk2");
        assert_eq!(tokens(&pattern, 0), &[Psk, E]);
        assert_eq!(tokens(&pattern, 1), &[E, EE, Psk]);
        assert_eq!(pattern.psk_count(), 2);
        assert_eq!(pattern.name(), "NNpsk0+psk2");

        let pattern = parse("Npsk0");
        assert!(pattern.is_one_way());
        assert_eq!(tokens(&pattern, 0), &[Psk, E, ES]);
    }

    #[test]
    fn invalid_patterns() {
        assert_eq!(
            "ZZ".parse::<HandshakePattern>(),
            Err(PatternError::UnknownPattern("ZZ".to_owned()))
        );
        assert_eq!(
            "".parse::<HandshakePattern>(),
            Err(PatternError::UnknownPattern("".to_owned()))
        );
        assert_eq!(
            "NNfallback".parse::<HandshakePattern>(),
            Err(PatternError::UnsupportedModifier("fallback".to_owned()))
        );
        assert_eq!(
            "NNpsk".parse::<HandshakePattern>(),
            Err(PatternError::UnsupportedModifier("psk".to_owned()))
        );
        assert_eq!(
            "NNpsk+1".parse::<HandshakePattern>(),
            Err(PatternError::UnsupportedModifier("psk".to_owned()))
        );
        assert_eq!(
            "NNpsk0+1".parse::<HandshakePattern>(),
            Err(PatternError::UnsupportedModifier("1".to_owned()))
        );
        assert_eq!(
            "NNpsk0+".parse::<HandshakePattern>(),
            Err(PatternError::UnsupportedModifier("".to_owned()))
        );
        assert_eq!(
            "NNpsk3".parse::<HandshakePattern>(),
            Err(PatternError::InvalidPskPosition {
                position: 3,
                messages: 2
            })
        );
    }

    #[test]
    fn static_keys_requirements() {
        let xx = parse("XX");
        assert!(xx.local_static_required(Role::Initiator));
        assert!(xx.local_static_required(Role::Responder));
        assert!(!xx.remote_static_required(Role::Initiator));
        assert!(!xx.remote_static_required(Role::Responder));

        let n = parse("N");
        assert!(!n.local_static_required(Role::Initiator));
        assert!(n.remote_static_required(Role::Initiator));
        assert!(n.local_static_required(Role::Responder));
        assert!(!n.remote_static_required(Role::Responder));

        let kn = parse("KN");
        assert!(kn.local_static_required(Role::Initiator));
        assert!(!kn.local_static_required(Role::Responder));
        assert!(kn.remote_static_required(Role::Responder));

        let nn = parse("NNpsk0");
        assert!(!nn.local_static_required(Role::Initiator));
        assert!(!nn.local_static_required(Role::Responder));
    }
}
