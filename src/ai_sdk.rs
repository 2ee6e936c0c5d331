mod openai;

pub(crate) use openai::*;
