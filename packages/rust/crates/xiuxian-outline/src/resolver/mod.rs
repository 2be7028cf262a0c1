//! Page name resolution: candidate file names and directory probing.

mod candidates;
mod dates;
mod encoding;
mod probe;

pub use self::candidates::{
    CandidateOptions, DEFAULT_MAX_CANDIDATES, build_candidates, strip_anchor_and_extension,
};
pub use self::dates::{
    canonical_journal_name, journal_file_base, journal_slash_form, parse_journal_date,
};
pub use self::encoding::{
    NAMESPACE_SEPARATOR, decode_page_name, encode_page_name, percent_decode_lossless,
};
pub use self::probe::{
    PROBE_EXTENSIONS, ResolveOptions, ResolvedFile, resolve, split_outline_file_name,
};
