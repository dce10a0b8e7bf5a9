pub mod attempt;
pub mod content;
pub mod exam;
pub mod grade;
pub mod progress;
pub mod question;
pub mod result;
