//! Input formatters read request bodies; output formatters write results.
//!
//! Both are selected first-match from the ordered lists in
//! [`MvcOptions`](crate::options::MvcOptions).

mod input;
mod json_input;
mod json_output;
mod no_content;
mod output;
mod stream_output;
mod string_output;
mod xml;
mod xml_input;
mod xml_output;

pub use input::{InputFormatter, InputFormatterContext, InputFormatterResult};
pub use json_input::JsonInputFormatter;
pub use json_output::JsonOutputFormatter;
pub use no_content::HttpNoContentOutputFormatter;
pub use output::{ObjectType, ObjectValue, OutputFormatter, OutputFormatterWriteContext};
pub use stream_output::StreamOutputFormatter;
pub use string_output::StringOutputFormatter;
pub use xml_input::XmlInputFormatter;
pub use xml_output::XmlOutputFormatter;
