use std::fmt;

use crate::format::{LOOKAHEAD, MIN_MATCH, WINDOW_SIZE};

use super::LzssBackend;

/// One unit of LZSS output: an uncoded byte, or a copy of earlier output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Literal(u8),
    /// copy `length` bytes starting `offset` bytes back from the end of the output
    Match { offset: usize, length: usize },
}

impl Token {
    /// total number of bytes this token expands to
    #[inline]
    pub fn size(&self) -> usize {
        match self {
            Self::Literal(..) => 1,
            Self::Match { length, .. } => *length,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Literal(b) => write!(f, "Uncoded: {:02x}", b),
            Self::Match { offset, length } => {
                write!(f, "Encoded [Copyback]: size: {} mb: {}", length, offset)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct MoveBack {
    pub length: usize,
    pub offset: usize,
}

impl MoveBack {
    fn new(length: usize, offset: usize) -> Self {
        Self { length, offset }
    }
}

/// Search the window behind `pos` for the longest match of the bytes at `pos`.
///
/// Implementations have to agree exactly: the longest match of at least
/// `MIN_MATCH` bytes wins, and between equally long matches the one furthest
/// back is kept.
pub(crate) trait MatchFinder {
    fn find(&mut self, data: &[u8], pos: usize) -> Option<MoveBack>;
}

/// the bytes at `pos` that a match could cover
#[inline]
fn lookahead(data: &[u8], pos: usize) -> &[u8] {
    let end = data.len().min(pos + LOOKAHEAD);
    &data[pos..end]
}

#[inline]
fn window_start(pos: usize) -> usize {
    pos.saturating_sub(WINDOW_SIZE)
}

/// number of bytes at `src` that equal `ahead`, which may run into `ahead` itself
#[inline]
fn run_length(data: &[u8], src: usize, ahead: &[u8]) -> usize {
    data[src..]
        .iter()
        .zip(ahead)
        .take_while(|(s, d)| s == d)
        .count()
}

/// Naive, brute force search of every position in the window
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct NaiveBrute;

impl MatchFinder for NaiveBrute {
    fn find(&mut self, data: &[u8], pos: usize) -> Option<MoveBack> {
        let ahead = lookahead(data, pos);

        (window_start(pos)..pos)
            .filter_map(|src| {
                let length = run_length(data, src, ahead);

                if length >= MIN_MATCH {
                    Some(MoveBack::new(length, pos - src))
                } else {
                    None
                }
            })
            // only a strictly longer match replaces the earliest one
            .fold(None, |best: Option<MoveBack>, cur| {
                best.filter(|best| best.length >= cur.length).or(Some(cur))
            })
    }
}

/// Search only the earlier positions that start with the same three bytes,
/// chained together by a hash of those bytes.
#[derive(Debug, Clone)]
pub(crate) struct HashChain {
    /// most recent position (+1) for each hash; 0 is empty
    head: Box<[usize]>,
    /// previous position (+1) with the same hash as the index
    prev: Vec<usize>,
    /// every position before this has been added to the chains
    inserted: usize,
}

impl HashChain {
    const HASH_BITS: u32 = 13;

    pub(crate) fn new(input_size: usize) -> Self {
        Self {
            head: vec![0; 1 << Self::HASH_BITS].into_boxed_slice(),
            prev: vec![0; input_size],
            inserted: 0,
        }
    }

    #[inline]
    fn hash(data: &[u8], pos: usize) -> usize {
        let key = u32::from(data[pos]) << 16
            | u32::from(data[pos + 1]) << 8
            | u32::from(data[pos + 2]);
        (key.wrapping_mul(2_654_435_761) >> (32 - Self::HASH_BITS)) as usize
    }

    fn insert_until(&mut self, data: &[u8], pos: usize) {
        let last = data.len().saturating_sub(MIN_MATCH - 1);
        while self.inserted < pos.min(last) {
            let p = self.inserted;
            let h = Self::hash(data, p);
            self.prev[p] = self.head[h];
            self.head[h] = p + 1;
            self.inserted += 1;
        }
    }
}

impl MatchFinder for HashChain {
    fn find(&mut self, data: &[u8], pos: usize) -> Option<MoveBack> {
        self.insert_until(data, pos);

        let ahead = lookahead(data, pos);
        if ahead.len() < MIN_MATCH {
            return None;
        }

        let start = window_start(pos);
        let mut best: Option<MoveBack> = None;
        let mut next = self.head[Self::hash(data, pos)];

        // chains run from nearest to furthest, so ties replace the current best
        while next != 0 && next - 1 >= start {
            let src = next - 1;
            let length = run_length(data, src, ahead);

            if length >= MIN_MATCH && best.map_or(true, |b| length >= b.length) {
                best = Some(MoveBack::new(length, pos - src));
            }
            next = self.prev[src];
        }

        best
    }
}

/// Iterator over the tokens of the greedy LZSS parse of `data`
pub(crate) struct Tokens<'a> {
    data: &'a [u8],
    pos: usize,
    finder: Box<dyn MatchFinder + 'a>,
}

impl<'a> Tokens<'a> {
    pub(crate) fn new(data: &'a [u8], backend: LzssBackend) -> Self {
        let finder: Box<dyn MatchFinder> = match backend {
            LzssBackend::Brute => Box::new(NaiveBrute),
            LzssBackend::HashChain => Box::new(HashChain::new(data.len())),
        };

        Self {
            data,
            pos: 0,
            finder,
        }
    }
}

impl Iterator for Tokens<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let byte = *self.data.get(self.pos)?;

        let token = match self.finder.find(self.data, self.pos) {
            Some(MoveBack { length, offset }) => Token::Match { offset, length },
            None => Token::Literal(byte),
        };
        self.pos += token.size();

        Some(token)
    }
}
