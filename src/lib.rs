pub mod helpers {
    pub mod bootstrap;
    pub mod logging;
    pub mod stop;
}
