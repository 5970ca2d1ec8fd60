//! Request routing.
//!
//! Names under the two registered prefixes are matched against a fixed
//! table of verb patterns, built once:
//!
//! | Scope  | Path under prefix                                    |
//! |--------|------------------------------------------------------|
//! | `info` | `state/<nonce>`                                      |
//! | `info` | `actions/all/<nonce>/<segment>`                      |
//! | `info` | `actions/file/<nonce>/<file path…>/<segment>`        |
//! | `info` | `filestate/all/<nonce>/<segment>`                    |
//! | `cmd`  | `restore/file/<relative-name>/<version>/<fingerprint>` |
//!
//! Anything else resolves to `None` and is ignored.

use chronostate_core::Component;

/// Which registered prefix a name arrived under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Info,
    Cmd,
}

/// A routed request.
///
/// The nonce is carried but never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    State {
        nonce: Component,
    },
    Actions {
        nonce: Component,
        /// Restrict the listing to one file.
        file: Option<String>,
        segment: u64,
    },
    FileState {
        nonce: Component,
        segment: u64,
    },
    /// Restore parameters, unparsed. The restore handler validates them.
    Restore {
        args: Vec<Component>,
    },
}

type Parser = fn(&[Component]) -> Option<Request>;

struct Route {
    scope: Scope,
    verb: &'static [&'static str],
    parse: Parser,
}

/// The pattern table.
pub struct RouteTable {
    routes: Vec<Route>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTable {
    pub fn new() -> Self {
        let routes = vec![
            Route {
                scope: Scope::Info,
                verb: &["state"],
                parse: parse_state,
            },
            Route {
                scope: Scope::Info,
                verb: &["actions", "all"],
                parse: parse_all_actions,
            },
            Route {
                scope: Scope::Info,
                verb: &["actions", "file"],
                parse: parse_file_actions,
            },
            Route {
                scope: Scope::Info,
                verb: &["filestate", "all"],
                parse: parse_filestate,
            },
            Route {
                scope: Scope::Cmd,
                verb: &["restore", "file"],
                parse: parse_restore,
            },
        ];
        Self { routes }
    }

    /// Match the components after a registered prefix.
    pub fn resolve(&self, scope: Scope, suffix: &[Component]) -> Option<Request> {
        self.routes
            .iter()
            .filter(|route| route.scope == scope)
            .find_map(|route| {
                let rest = strip_verb(suffix, route.verb)?;
                (route.parse)(rest)
            })
    }
}

fn strip_verb<'a>(suffix: &'a [Component], verb: &[&str]) -> Option<&'a [Component]> {
    if suffix.len() < verb.len() {
        return None;
    }
    let (head, rest) = suffix.split_at(verb.len());
    head.iter()
        .zip(verb)
        .all(|(component, word)| component.as_bytes() == word.as_bytes())
        .then_some(rest)
}

fn parse_state(rest: &[Component]) -> Option<Request> {
    match rest {
        [nonce] => Some(Request::State {
            nonce: nonce.clone(),
        }),
        _ => None,
    }
}

fn parse_all_actions(rest: &[Component]) -> Option<Request> {
    match rest {
        [nonce, segment] => Some(Request::Actions {
            nonce: nonce.clone(),
            file: None,
            segment: segment.to_number()?,
        }),
        _ => None,
    }
}

fn parse_file_actions(rest: &[Component]) -> Option<Request> {
    match rest {
        [nonce, path @ .., segment] if !path.is_empty() => {
            let parts = path
                .iter()
                .map(|c| c.to_utf8().filter(|s| !s.is_empty()))
                .collect::<Option<Vec<_>>>()?;
            Some(Request::Actions {
                nonce: nonce.clone(),
                file: Some(parts.join("/")),
                segment: segment.to_number()?,
            })
        }
        _ => None,
    }
}

fn parse_filestate(rest: &[Component]) -> Option<Request> {
    match rest {
        [nonce, segment] => Some(Request::FileState {
            nonce: nonce.clone(),
            segment: segment.to_number()?,
        }),
        _ => None,
    }
}

fn parse_restore(rest: &[Component]) -> Option<Request> {
    if rest.is_empty() {
        return None;
    }
    Some(Request::Restore {
        args: rest.to_vec(),
    })
}
