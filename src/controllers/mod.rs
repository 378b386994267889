pub mod pastie;
