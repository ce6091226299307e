pub mod loop_;

pub use loop_::run;
