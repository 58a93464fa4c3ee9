mod build;
mod injections;
mod preprocess;
mod subclasses;

pub use build::{build_profiles, BuildArgs};
pub use injections::{list_injections, InjectionsArgs};
pub use preprocess::{preprocess_file, PreprocessArgs};
pub use subclasses::{list_subclasses, SubclassesArgs};
