use repose_runtime::{remember, use_unmount};

use crate::fetch::Fetch;
use crate::options::RequestOptions;
use crate::plugin::{PluginFactory, Service};
use crate::plugins::{AutoRunPlugin, CachePlugin, PollingPlugin, RateLimitedPlugin, RetryPlugin};

/// Binds a request engine to the calling component.
///
/// The engine is created on the first pass and kept for the component's
/// lifetime; later passes only refresh its service and options. Runs happen
/// on mount (unless `manual`), when `ready` turns true and when
/// `refresh_deps` change. Unmounting disposes the engine, cancelling pending
/// and in-flight work.
pub fn use_request<P, R>(service: Service<P, R>, options: RequestOptions<P, R>) -> Fetch<P, R>
where
    P: Clone + 'static,
    R: Clone + 'static,
{
    use_request_with_plugins(service, options, Vec::new)
}

/// [`use_request`] with extra plugins appended after the built-ins.
/// `plugins` is only called on the first pass.
pub fn use_request_with_plugins<P, R>(
    service: Service<P, R>,
    options: RequestOptions<P, R>,
    plugins: impl FnOnce() -> Vec<PluginFactory<P, R>>,
) -> Fetch<P, R>
where
    P: Clone + 'static,
    R: Clone + 'static,
{
    let debounce = remember(RateLimitedPlugin::debounce);
    let polling = remember(PollingPlugin::default);
    let throttle = remember(RateLimitedPlugin::throttle);
    let auto_run = remember(|| AutoRunPlugin::new(options.ready));
    let cache = remember(CachePlugin::default);
    let retry = remember(RetryPlugin::default);

    debounce.sync(&options);
    polling.sync(&options);
    throttle.sync(&options);
    cache.sync(&options);
    retry.sync(&options);

    let fetch = remember(|| {
        let mut factories = vec![
            debounce.factory(),
            polling.factory(),
            throttle.factory(),
            auto_run.factory(),
            cache.factory(),
            retry.factory(),
        ];
        factories.extend(plugins());
        Fetch::with_plugins(service.clone(), options.clone(), factories)
    });
    fetch.sync(service, options.clone());
    auto_run.compose(&fetch, &options);

    let handle = fetch.handle();
    use_unmount(move || handle.dispose());

    (*fetch).clone()
}
