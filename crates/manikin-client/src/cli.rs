use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "manikin", version, about = "manikin - a third-person character playground")]
pub struct CliArgs {
    /// Path to the scene YAML file, relative to the project root
    #[arg(long, default_value = "scenes/kinematic.yaml")]
    pub scene: String,

    /// Path to the demo project root directory
    #[arg(long, default_value = "demos")]
    pub project: String,
}
