pub mod goldprice;
