use std::collections::HashSet;

/// Distinct token strings of one text. Order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShingleSet {
    shingles: HashSet<String>,
}

impl ShingleSet {
    pub fn new() -> Self { Self::default() }

    pub fn from_tokens<'a, I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let shingles = tokens.into_iter().map(str::to_owned).collect();
        Self { shingles }
    }

    pub fn len(&self) -> usize { self.shingles.len() }
    pub fn is_empty(&self) -> bool { self.shingles.is_empty() }

    pub fn contains(&self, shingle: &str) -> bool {
        self.shingles.contains(shingle)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.shingles.iter().map(String::as_str)
    }

    /// `|self ∩ other|`, walking the smaller side.
    pub fn intersection_len(&self, other: &ShingleSet) -> usize {
        let (small, large) = if self.len() <= other.len() { (self, other) } else { (other, self) };
        small.shingles.iter().filter(|s| large.shingles.contains(*s)).count()
    }
}

impl<'a> FromIterator<&'a str> for ShingleSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self::from_tokens(iter)
    }
}
