//! Cookie jars for single and multi-session runs

use rand::Rng;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Cookies carried by outgoing requests.
///
/// A single jar is sent as-is on every request; a multi-session jar
/// simulates distinct logged-in users by picking one session uniformly
/// at random per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cookies {
    Single(Vec<Cookie>),
    MultiSession(Vec<Vec<Cookie>>),
}

impl Cookies {
    /// The cookie set to send on one request.
    pub fn select(&self) -> &[Cookie] {
        match self {
            Cookies::Single(set) => set,
            Cookies::MultiSession(sessions) if sessions.is_empty() => &[],
            Cookies::MultiSession(sessions) => {
                &sessions[rand::rng().random_range(0..sessions.len())]
            }
        }
    }

    /// Merge `name=value` pairs from the CLI into the jar: into the
    /// single set, or into the first session of a multi-session jar.
    pub fn merge_custom(&mut self, pairs: &[(String, String)]) {
        let target = match self {
            Cookies::Single(set) => set,
            Cookies::MultiSession(sessions) => {
                if sessions.is_empty() {
                    sessions.push(Vec::new());
                }
                &mut sessions[0]
            }
        };
        for (name, value) in pairs {
            target.push(Cookie::new(name, value));
        }
    }

    /// `Cookie:` header value for one set.
    pub fn header_value(set: &[Cookie]) -> String {
        set.iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_value_joins_pairs() {
        let set = vec![Cookie::new("session", "abc"), Cookie::new("lang", "en")];
        assert_eq!(Cookies::header_value(&set), "session=abc; lang=en");
    }

    #[test]
    fn test_single_jar_always_selects_same_set() {
        let jar = Cookies::Single(vec![Cookie::new("a", "1")]);
        for _ in 0..10 {
            assert_eq!(jar.select().len(), 1);
            assert_eq!(jar.select()[0].name, "a");
        }
    }

    #[test]
    fn test_multi_session_selects_one_of_the_sessions() {
        let jar = Cookies::MultiSession(vec![
            vec![Cookie::new("user", "alice")],
            vec![Cookie::new("user", "bob")],
        ]);
        for _ in 0..20 {
            let set = jar.select();
            assert_eq!(set.len(), 1);
            assert!(set[0].value == "alice" || set[0].value == "bob");
        }
    }

    #[test]
    fn test_merge_custom_into_single() {
        let mut jar = Cookies::Single(vec![Cookie::new("session", "abc")]);
        jar.merge_custom(&[("test_group".to_string(), "b".to_string())]);
        assert_eq!(jar.select().len(), 2);
    }

    #[test]
    fn test_merge_custom_into_first_session_only() {
        let mut jar = Cookies::MultiSession(vec![
            vec![Cookie::new("user", "alice")],
            vec![Cookie::new("user", "bob")],
        ]);
        jar.merge_custom(&[("flag".to_string(), "on".to_string())]);
        match &jar {
            Cookies::MultiSession(sessions) => {
                assert_eq!(sessions[0].len(), 2);
                assert_eq!(sessions[1].len(), 1);
            }
            _ => unreachable!(),
        }
    }
}
