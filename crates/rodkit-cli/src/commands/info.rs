use super::load_trajectory;
use crate::cli::InfoArgs;
use crate::error::Result;
use rodkit::core::models::channel::Channel;

pub fn run(args: InfoArgs) -> Result<()> {
    let (rod, metadata) = load_trajectory(&args.input)?;

    println!("File:      {}", args.input.display());
    println!("Format:    {} v{}", metadata.format, metadata.version);
    println!("Rod:       {} of {}", rod.rod_id(), rod.num_rods());
    println!("Nodes:     {} ({} segments)", rod.num_elements(), rod.num_segments());
    println!("Frames:    {}", rod.num_frames());
    println!("Channels:");
    for channel in Channel::ALL {
        println!("  {:<40} width {}", channel.name(), rod.channel(channel).width());
    }
    Ok(())
}
