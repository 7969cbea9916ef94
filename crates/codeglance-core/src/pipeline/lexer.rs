//! Filename -> grammar resolution with an LRU memo.
//!
//! The same filenames recur across webhook batches, and the resolver is hit
//! twice per file (ingestion filter, then render), so resolutions are cached.
//! Unsupported names are cached too.

use lru::LruCache;
use std::fmt;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use syntect::parsing::{SyntaxReference, SyntaxSet};

/// A grammar resolved for a particular filename.
#[derive(Clone)]
pub struct Lexer {
    syntaxes: Arc<SyntaxSet>,
    index: usize,
}

impl Lexer {
    /// Human-readable language name (e.g. "Python").
    pub fn name(&self) -> &str {
        &self.syntax().name
    }

    /// The syntect grammar.
    pub fn syntax(&self) -> &SyntaxReference {
        &self.syntaxes.syntaxes()[self.index]
    }

    /// The syntax set the grammar belongs to (needed for highlighting).
    pub fn syntax_set(&self) -> &SyntaxSet {
        &self.syntaxes
    }
}

impl PartialEq for Lexer {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && Arc::ptr_eq(&self.syntaxes, &other.syntaxes)
    }
}

impl Eq for Lexer {}

impl fmt::Debug for Lexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lexer")
            .field("name", &self.name())
            .field("index", &self.index)
            .finish()
    }
}

/// Maps filenames to grammars, or `None` when nothing matches.
pub struct LexerResolver {
    syntaxes: Arc<SyntaxSet>,
    cache: Mutex<LruCache<String, Option<usize>>>,
}

impl LexerResolver {
    /// Create a resolver over the extended grammar set (syntect's defaults
    /// plus TypeScript, TOML, Dockerfile, Kotlin, Swift and friends).
    pub fn new(cache_size: usize) -> Self {
        Self::with_syntax_set(two_face::syntax::extra_newlines(), cache_size)
    }

    /// Create a resolver over a custom syntax set.
    pub fn with_syntax_set(syntaxes: SyntaxSet, cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            syntaxes: Arc::new(syntaxes),
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Resolve the grammar for a filename or depot path.
    ///
    /// Only the final path component is considered.
    pub fn resolve(&self, filename: &str) -> Option<Lexer> {
        let name = file_name(filename);

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let index = match cache.get(name) {
            Some(hit) => *hit,
            None => {
                let found = self.lookup(name);
                if found.is_none() {
                    tracing::trace!("No grammar for {name}");
                }
                cache.put(name.to_string(), found);
                found
            }
        };

        index.map(|index| Lexer {
            syntaxes: Arc::clone(&self.syntaxes),
            index,
        })
    }

    /// Whether a grammar exists for this filename.
    pub fn is_supported(&self, filename: &str) -> bool {
        self.resolve(filename).is_some()
    }

    /// Number of cached resolutions.
    pub fn cached(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whole file name first (`Makefile`, `Dockerfile`), then the extension.
    fn lookup(&self, name: &str) -> Option<usize> {
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty());

        let found = self
            .syntaxes
            .find_syntax_by_extension(name)
            .or_else(|| extension.and_then(|ext| self.syntaxes.find_syntax_by_extension(ext)))?;

        self.syntaxes
            .syntaxes()
            .iter()
            .position(|syntax| std::ptr::eq(syntax, found))
    }
}

/// Final component of a `/` or `\` separated path.
fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
