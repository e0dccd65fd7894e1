//! Case and run identifiers.
use rand::Rng;
use regex::Regex;
use std::collections::{HashSet, VecDeque};
use std::sync::OnceLock;
use uuid::Uuid;

pub const CASE_ID_PREFIX: char = 'c';
pub const CASE_ID_RANDOM_LEN: usize = 12;
const CASE_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const RUN_SUFFIX_LEN: usize = 20;
const MAX_REDRAWS: usize = 16;

/// Produces fresh case identifiers.
pub trait IdSource {
    fn next_id(&mut self) -> String;
}

/// `c` followed by 12 symbols drawn uniformly from `[a-z0-9]`.
#[derive(Debug, Default)]
pub struct RandomCaseIds;

impl IdSource for RandomCaseIds {
    fn next_id(&mut self) -> String {
        let mut rng = rand::thread_rng();
        let mut id = String::with_capacity(1 + CASE_ID_RANDOM_LEN);
        id.push(CASE_ID_PREFIX);
        for _ in 0..CASE_ID_RANDOM_LEN {
            let idx = rng.gen_range(0..CASE_ID_ALPHABET.len());
            id.push(char::from(CASE_ID_ALPHABET[idx]));
        }
        id
    }
}

/// Hands out a fixed list of ids, then `c000000000001`, `c000000000002`, ...
#[derive(Debug, Default)]
pub struct SequenceIds {
    queued: VecDeque<String>,
    counter: u64,
}

impl SequenceIds {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queued: ids.into_iter().map(Into::into).collect(),
            counter: 0,
        }
    }
}

impl IdSource for SequenceIds {
    fn next_id(&mut self) -> String {
        if let Some(id) = self.queued.pop_front() {
            return id;
        }
        self.counter += 1;
        format!("{CASE_ID_PREFIX}{:0width$}", self.counter, width = CASE_ID_RANDOM_LEN)
    }
}

/// Redraws ids already present in `taken`, including ids it issued itself.
///
/// An id still taken after the redraw limit is handed out anyway and
/// recorded; callers must check [`ExcludingIds::unresolved`] before writing.
pub struct ExcludingIds<'a> {
    inner: &'a mut dyn IdSource,
    taken: HashSet<String>,
    unresolved: Vec<String>,
}

impl<'a> ExcludingIds<'a> {
    pub fn new(inner: &'a mut dyn IdSource, taken: impl IntoIterator<Item = String>) -> Self {
        Self {
            inner,
            taken: taken.into_iter().collect(),
            unresolved: Vec::new(),
        }
    }

    /// Ids issued while still colliding with a taken id.
    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }
}

impl IdSource for ExcludingIds<'_> {
    fn next_id(&mut self) -> String {
        let mut id = self.inner.next_id();
        let mut redraws = 0;
        while self.taken.contains(&id) {
            if redraws == MAX_REDRAWS {
                tracing::error!(case_id = %id, redraws, "no free case id after redrawing");
                self.unresolved.push(id.clone());
                return id;
            }
            tracing::warn!(case_id = %id, "case id already taken; redrawing");
            id = self.inner.next_id();
            redraws += 1;
        }
        self.taken.insert(id.clone());
        id
    }
}

/// True for ids of the form `c[a-z0-9]{12}`.
pub fn is_case_id(candidate: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^c[a-z0-9]{12}$").expect("case id pattern compiles"))
        .is_match(candidate)
}

/// Batch job id for one run of a case: the case id plus 20 hex characters.
pub fn run_name(case_id: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{case_id}{}", &suffix[..RUN_SUFFIX_LEN])
}
