pub mod orchestra;
