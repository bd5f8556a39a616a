pub mod ses;
pub mod sparkpost;

pub use ses::AwsSesBackend;
pub use sparkpost::SparkPostBackend;
