mod common;
mod normalizer;
mod service;
