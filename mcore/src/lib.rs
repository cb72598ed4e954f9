pub mod tagml;
