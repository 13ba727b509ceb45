mod course;
mod lesson;
mod progress;
mod student;

pub use course::*;
pub use lesson::*;
pub use progress::*;
pub use student::*;
