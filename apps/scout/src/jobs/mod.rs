// Job intake: where listings come from and which ones are worth a proposal.

pub mod filter;
pub mod recency;
pub mod source;
