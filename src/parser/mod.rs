pub mod goodreads;
pub mod tabular;
