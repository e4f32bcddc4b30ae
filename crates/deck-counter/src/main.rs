mod actions;
mod plugin;

use actions::SharedCount;
use plugin::CounterPlugin;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let count = SharedCount::default();
    deck_plugin::launch(CounterPlugin::new(count.clone()), actions::catalog(&count)).await
}
