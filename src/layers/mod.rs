pub mod added;
pub mod collection;
pub mod descriptor;
pub mod icon;
pub mod order;
pub mod stack;
pub mod unit;
